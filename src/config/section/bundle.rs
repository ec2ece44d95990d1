//! `[bundle]` section: where the widget script is read from and written to.
//!
//! # Example
//!
//! ```toml
//! [bundle]
//! input = "src/fix-broken-img.js"
//! output = "dist/fix-broken-img.js"
//! minified_output = "dist/fix-broken-img.min.js"
//! ```

use crate::config::ConfigDiagnostics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Widget script source.
    pub input: PathBuf,
    /// Development bundle (verbatim copy).
    pub output: PathBuf,
    /// Minified bundle.
    pub minified_output: PathBuf,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            input: "src/fix-broken-img.js".into(),
            output: "dist/fix-broken-img.js".into(),
            minified_output: "dist/fix-broken-img.min.js".into(),
        }
    }
}

impl BundleConfig {
    /// Resolve relative paths against the project root.
    pub fn normalize(&mut self, root: &Path) {
        for path in [&mut self.input, &mut self.output, &mut self.minified_output] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.input.as_os_str().is_empty() {
            diag.error("bundle.input", "must not be empty");
        }
        if self.output == self.minified_output {
            diag.error_with_hint(
                "bundle.minified_output",
                "must differ from `bundle.output`",
                "e.g. dist/fix-broken-img.min.js",
            );
        }
        if self.output == self.input || self.minified_output == self.input {
            diag.error("bundle.output", "would overwrite the input file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_joins_relative_only() {
        let mut config = BundleConfig {
            input: "/abs/widget.js".into(),
            ..BundleConfig::default()
        };
        config.normalize(Path::new("/site"));
        assert_eq!(config.input, PathBuf::from("/abs/widget.js"));
        assert_eq!(config.output, PathBuf::from("/site/dist/fix-broken-img.js"));
    }

    #[test]
    fn test_validate_same_outputs() {
        let config = BundleConfig {
            minified_output: "dist/fix-broken-img.js".into(),
            ..BundleConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
