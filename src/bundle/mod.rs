//! Widget script bundling.
//!
//! Writes two files from the widget source: a verbatim development bundle
//! and a minified bundle. The minifier is deliberately naive (regex
//! passes, no parsing) and can break scripts whose string literals contain
//! `//` or `/*`.

pub mod watch;

use crate::config::BundleConfig;
use crate::log;
use crate::utils::hash;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file watcher: {0}")]
    Watch(#[from] notify::Error),
}

static BLOCK_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)//.*$").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PUNCT_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}();:,])\s*").unwrap());

/// Strip comments and squeeze whitespace.
pub fn minify(code: &str) -> String {
    let code = BLOCK_COMMENT.replace_all(code, "");
    let code = LINE_COMMENT.replace_all(&code, "");
    let code = WHITESPACE.replace_all(&code, " ");
    let code = PUNCT_SPACE.replace_all(&code, "$1");
    code.trim().to_string()
}

/// What one build wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub minified_output: PathBuf,
    pub source_bytes: usize,
    pub minified_bytes: usize,
    /// FxHash of the source, used to skip rebuilds in watch mode.
    #[serde(skip)]
    pub source_hash: u64,
}

impl BuildReport {
    /// Minified size as a percentage of the source.
    pub fn ratio(&self) -> f64 {
        if self.source_bytes == 0 {
            return 100.0;
        }
        self.minified_bytes as f64 * 100.0 / self.source_bytes as f64
    }
}

/// Read the source and write both bundles.
pub fn build(config: &BundleConfig) -> Result<BuildReport, BuildError> {
    let source = fs::read_to_string(&config.input).map_err(|source| BuildError::Read {
        path: config.input.clone(),
        source,
    })?;
    build_source(config, &source)
}

fn build_source(config: &BundleConfig, source: &str) -> Result<BuildReport, BuildError> {
    write_file(&config.output, source)?;
    let minified = minify(source);
    write_file(&config.minified_output, &minified)?;

    let report = BuildReport {
        input: config.input.clone(),
        output: config.output.clone(),
        minified_output: config.minified_output.clone(),
        source_bytes: source.len(),
        minified_bytes: minified.len(),
        source_hash: hash::compute(source),
    };
    crate::debug!("build"; "source {} -> {} bytes ({:.1}%)", report.source_bytes, report.minified_bytes, report.ratio());
    Ok(report)
}

/// Create parent directories as needed.
fn write_file(path: &Path, content: &str) -> Result<(), BuildError> {
    let write = || {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Build once and log both outputs.
pub fn build_and_log(config: &BundleConfig) -> Result<BuildReport, BuildError> {
    log!("build"; "bundling {}", config.input.display());
    let report = build(config)?;
    log!("build"; "wrote {}", report.output.display());
    log!("build"; "wrote {} ({:.1}%)", report.minified_output.display(), report.ratio());
    Ok(report)
}
