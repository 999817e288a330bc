//! Discovery of local storage devices to mount on first run
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// A candidate root for a local mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDevice {
    /// Display name, also the mount path for non-primary devices
    pub name: String,
    pub path: PathBuf,
    pub primary: bool,
    pub removable: bool,
}

impl StorageDevice {
    pub fn primary(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "internal".to_string(),
            path: path.into(),
            primary: true,
            removable: false,
        }
    }

    /// A removable device named after the last component of its path
    pub fn removable(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "external".to_string());
        Self {
            name,
            path,
            primary: false,
            removable: true,
        }
    }

    /// Mount path for this device; the primary device takes `primary_mount_path`
    pub fn mount_path(&self, primary_mount_path: &str) -> String {
        if self.primary {
            primary_mount_path.to_string()
        } else {
            format!("/{}", self.name)
        }
    }
}

/// Keep the candidates that exist, are directories and can be listed
pub fn discover(candidates: impl IntoIterator<Item = StorageDevice>) -> Vec<StorageDevice> {
    candidates
        .into_iter()
        .filter(|device| {
            let readable = fs::read_dir(&device.path).is_ok();
            if !readable {
                warn!(
                    path = %device.path.display(),
                    name = %device.name,
                    "skipping inaccessible storage device"
                );
            }
            readable
        })
        .collect()
}

/// Check that `dir` really accepts writes
///
/// Creates, writes, renames and deletes a hidden temp file. Some mounts report
/// themselves writable but refuse renames, so every step is exercised.
pub fn probe_write(dir: &Path) -> bool {
    if !dir.is_dir() {
        debug!(path = %dir.display(), "write probe target is not a directory");
        return false;
    }

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let probe = dir.join(format!(".mountkeeper_write_probe_{}.tmp", stamp));
    let renamed = dir.join(format!(".mountkeeper_write_probe_{}.renamed", stamp));

    let result = (|| -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&probe)?;
        file.write_all(b"mountkeeper write probe")?;
        file.sync_all()?;
        drop(file);
        fs::rename(&probe, &renamed)?;
        fs::remove_file(&renamed)?;
        Ok(())
    })();

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "write probe failed");
            let _ = fs::remove_file(&probe);
            let _ = fs::remove_file(&renamed);
            false
        }
    }
}
