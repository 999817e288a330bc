use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::MountkeeperConfig;
use crate::xdg;

pub const CONFIG_FILENAME: &str = "mountkeeper.toml";

/// Discovers mountkeeper configuration by traversing up the directory tree
pub fn discover_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    // Fallback to global config
    let global_config = xdg::config_dir().join("config.toml");
    if global_config.exists() {
        return Ok(Some(global_config));
    }

    Ok(None)
}

/// Loads configuration with auto-discovery support
///
/// If `explicit_path` is provided, loads config from that path.
/// Otherwise, auto-discovers config by traversing up directory tree from cwd,
/// and falls back to defaults when nothing is found.
pub fn load_config_with_discovery(explicit_path: Option<&str>) -> Result<MountkeeperConfig> {
    if let Some(config_path) = explicit_path {
        return MountkeeperConfig::from_file(config_path);
    }

    let current_dir =
        std::env::current_dir().context("Failed to get current directory for config discovery")?;

    match discover_config(&current_dir)? {
        Some(discovered_path) => {
            tracing::debug!("Using config: {}", discovered_path.display());
            MountkeeperConfig::from_file(&discovered_path)
        }
        None => Ok(MountkeeperConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_config_finds_nearest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let project = root.join("project");
        let subdir = project.join("subdir");
        fs::create_dir_all(&subdir).unwrap();

        let config_path = project.join(CONFIG_FILENAME);
        fs::write(&config_path, "# test config").unwrap();

        let found = discover_config(&subdir).unwrap();
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("custom.toml");
        fs::write(&config_path, "[flags]\nlog_std = true\n").unwrap();

        let config = load_config_with_discovery(config_path.to_str()).unwrap();
        assert!(config.flags.log_std);
    }

    #[test]
    fn test_explicit_path_missing_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.toml");
        assert!(load_config_with_discovery(missing.to_str()).is_err());
    }
}
