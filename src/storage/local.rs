//! Addition payload of the local-filesystem driver
//!
//! The JSON shape is shared with the driver that serves the mount, so the
//! key names below must not change.
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::descriptor::STATUS_WORK;
use super::RegistryError;

/// `mkdir_perm` granting read, write and execute to owner, group and other
pub const MKDIR_PERM_ALL: &str = "777";

/// `recycle_bin_path` value that bypasses the recycle bin
pub const DELETE_PERMANENTLY: &str = "delete permanently";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAddition {
    pub root_folder_path: String,
    pub thumbnail: bool,
    pub thumb_cache_folder: String,
    pub show_hidden: bool,
    pub mkdir_perm: String,
    pub recycle_bin_path: String,
}

impl LocalAddition {
    /// Payload used for administrator-initiated mounts of trusted paths:
    /// hidden files visible, no thumbnails, `777` directories, permanent delete
    pub fn permissive(root_folder_path: impl Into<String>) -> Self {
        Self {
            root_folder_path: root_folder_path.into(),
            thumbnail: false,
            thumb_cache_folder: String::new(),
            show_hidden: true,
            mkdir_perm: MKDIR_PERM_ALL.to_string(),
            recycle_bin_path: DELETE_PERMANENTLY.to_string(),
        }
    }

    pub fn parse(addition: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(addition).map_err(|e| RegistryError::InvalidAddition(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, RegistryError> {
        serde_json::to_string(self).map_err(|e| RegistryError::InvalidAddition(e.to_string()))
    }

    /// Directory mode parsed from `mkdir_perm`
    pub fn mkdir_mode(&self) -> Result<u32, RegistryError> {
        let mode = u32::from_str_radix(&self.mkdir_perm, 8).map_err(|_| {
            RegistryError::InvalidAddition(format!(
                "mkdir_perm must be an octal permission string, got {:?}",
                self.mkdir_perm
            ))
        })?;

        if mode > 0o7777 {
            return Err(RegistryError::InvalidAddition(format!(
                "mkdir_perm out of range: {}",
                self.mkdir_perm
            )));
        }

        Ok(mode)
    }

    pub fn deletes_permanently(&self) -> bool {
        self.recycle_bin_path == DELETE_PERMANENTLY
    }

    /// Structural checks; the root folder is not required to exist
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.root_folder_path.trim().is_empty() {
            return Err(RegistryError::InvalidAddition(
                "root_folder_path must be set".to_string(),
            ));
        }

        self.mkdir_mode()?;

        if self.recycle_bin_path.trim().is_empty() {
            return Err(RegistryError::InvalidAddition(
                "recycle_bin_path must be set".to_string(),
            ));
        }

        Ok(())
    }

    /// Driver status for this root
    pub fn probe(&self) -> String {
        if Path::new(&self.root_folder_path).is_dir() {
            STATUS_WORK.to_string()
        } else {
            format!(
                "root folder path is not a directory: {}",
                self.root_folder_path
            )
        }
    }
}
