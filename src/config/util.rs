//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find the config file by searching upward from `start`.
///
/// Absolute names are returned as-is when they exist.
///
/// ```text
/// /home/user/site/pages/blog/      ← start
/// /home/user/site/fix-broken-img.toml  ← found
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("pages/blog");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("fix-broken-img.toml"), "").unwrap();

        let found = find_config_file(Path::new("fix-broken-img.toml"), &nested).unwrap();
        assert_eq!(found, temp.path().join("fix-broken-img.toml"));
    }

    #[test]
    fn test_find_config_missing() {
        let temp = TempDir::new().unwrap();
        assert!(find_config_file(Path::new("nope-unlikely.toml"), temp.path()).is_none());
    }
}
