//! Configuration for `fix-broken-img.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [widget] and [bundle]
//! ├── types/         # ConfigError, ConfigDiagnostics, ConfigHandle
//! ├── util.rs        # config file discovery
//! └── mod.rs         # FileConfig (this file)
//! ```
//!
//! Widget options are layered, later layers winning:
//! built-in defaults → `[widget]` → page carrier element → CLI flags.

pub mod section;
pub mod types;
mod util;

pub use section::{
    BundleConfig, CARRIER_ID, DEFAULT_BACKGROUND, DEFAULT_TEXT, DEFAULT_TEXT_COLOR, WidgetConfig,
};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, ConfigHandle};
pub use util::find_config_file;

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "fix-broken-img.toml";

/// Root configuration structure representing `fix-broken-img.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub widget: WidgetConfig,

    #[serde(default)]
    pub bundle: BundleConfig,
}

impl FileConfig {
    /// Locate and load the config file, or fall back to defaults rooted at `cwd`.
    pub fn discover(name: &Path, cwd: &Path) -> Result<Self, ConfigError> {
        match find_config_file(name, cwd) {
            Some(path) => Self::load(&path),
            None => {
                crate::debug!("config"; "no {} found, using defaults", name.display());
                let mut config = Self::default();
                config.finalize(cwd);
                Ok(config)
            }
        }
    }

    /// Load, normalize and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        let root = path.parent().unwrap_or(Path::new("."));
        config.finalize(root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no path resolution).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    fn finalize(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.bundle.normalize(root);
    }

    /// Run section validation; warnings are printed, errors returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.widget.validate(&mut diag);
        self.bundle.validate(&mut diag);
        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.widget, WidgetConfig::default());
        assert_eq!(config.bundle, BundleConfig::default());
    }

    #[test]
    fn test_parse_sections() {
        let config = FileConfig::from_toml(
            r##"
            [widget]
            background = "#000"
            default_text = "missing"

            [bundle]
            input = "widget.js"
            "##,
        )
        .unwrap();
        assert_eq!(config.widget.background, "#000");
        assert_eq!(config.widget.default_text, "missing");
        assert_eq!(config.widget.text_color, DEFAULT_TEXT_COLOR);
        assert_eq!(config.bundle.input, PathBuf::from("widget.js"));
    }

    #[test]
    fn test_unknown_fields_are_collected() {
        let (_, ignored) =
            FileConfig::parse_with_ignored("[widget]\ncolour = \"red\"\n").unwrap();
        assert_eq!(ignored, vec!["widget.colour".to_string()]);
    }

    #[test]
    fn test_load_resolves_paths_against_file_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[bundle]\ninput = \"js/widget.js\"\n").unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.root, temp.path());
        assert_eq!(config.bundle.input, temp.path().join("js/widget.js"));
    }

    #[test]
    fn test_load_reports_validation_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "[widget]\ndefault_text = \"\"\n").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Diagnostics(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
