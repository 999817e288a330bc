//! XDG Base Directory support for mountkeeper
//!
//! Follows the XDG Base Directory Specification:
//! - https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
//!
//! Directory structure:
//! - `$XDG_DATA_HOME/mountkeeper/` (default: `~/.local/share/mountkeeper/`) - Metadata database, logs
//! - `$XDG_CONFIG_HOME/mountkeeper/` (default: `~/.config/mountkeeper/`) - Configuration files

use std::path::PathBuf;

/// Get the mountkeeper data directory (metadata database, log file, init marker)
///
/// Respects XDG_DATA_HOME environment variable.
/// Falls back to `$HOME/.local/share/mountkeeper` on Unix, or appropriate path on other platforms.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("mountkeeper")
    } else if let Some(data) = dirs::data_dir() {
        data.join("mountkeeper")
    } else if let Some(home) = dirs::home_dir() {
        // XDG spec default: $HOME/.local/share
        home.join(".local").join("share").join("mountkeeper")
    } else {
        PathBuf::from(".mountkeeper-data")
    }
}

/// Get the mountkeeper config directory
///
/// Respects XDG_CONFIG_HOME environment variable.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("mountkeeper")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join("mountkeeper")
    } else {
        PathBuf::from(".mountkeeper-config")
    }
}
