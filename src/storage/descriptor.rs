use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::local::LocalAddition;
use super::RegistryError;

/// Registry-assigned storage identifier
pub type StorageId = u64;

/// Backend type of a mounted storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverKind {
    /// Local filesystem
    Local,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Local => "Local",
        }
    }

    /// Check that `addition` is a valid payload for this driver
    pub fn validate_addition(&self, addition: &str) -> Result<(), RegistryError> {
        match self {
            DriverKind::Local => LocalAddition::parse(addition)?.validate(),
        }
    }

    /// Probe the backend described by `addition`
    ///
    /// Returns the status string stored on the descriptor: `"work"` when the
    /// backend is usable, an error message otherwise.
    pub fn probe(&self, addition: &str) -> String {
        match self {
            DriverKind::Local => match LocalAddition::parse(addition) {
                Ok(local) => local.probe(),
                Err(e) => e.to_string(),
            },
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How reads from remote clients are proxied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyPolicy {
    /// Serve range and streaming requests directly from the backend
    #[serde(rename = "native_proxy")]
    NativeProxy,
    /// Proxy through the configured proxy URL
    #[serde(rename = "use_proxy_url")]
    UseProxyUrl,
    /// Redirect the client to the backend link
    #[serde(rename = "302_redirect")]
    Redirect,
}

pub const STATUS_WORK: &str = "work";

/// One mounted backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Assigned by the registry on creation; ignored on input
    #[serde(default)]
    pub id: StorageId,
    pub driver: DriverKind,
    pub mount_path: String,
    pub proxy: ProxyPolicy,
    pub enable_sign: bool,
    /// Driver-specific JSON payload
    pub addition: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub status: String,
    pub modified: DateTime<Utc>,
}

impl StorageDescriptor {
    pub fn new(driver: DriverKind, mount_path: impl Into<String>, addition: String) -> Self {
        Self {
            id: 0,
            driver,
            mount_path: mount_path.into(),
            proxy: ProxyPolicy::NativeProxy,
            enable_sign: false,
            addition,
            order: 0,
            remark: String::new(),
            disabled: false,
            status: String::new(),
            modified: Utc::now(),
        }
    }

    pub fn is_working(&self) -> bool {
        self.status == STATUS_WORK
    }

    /// Decode the addition as a local-filesystem payload
    pub fn local_addition(&self) -> Result<LocalAddition, RegistryError> {
        LocalAddition::parse(&self.addition)
    }
}

/// Normalize a mount path
///
/// Leading `/` is enforced, repeated separators collapse, `.` and `..` are
/// resolved lexically and a trailing `/` is dropped. `..` never climbs above
/// the root.
pub fn clean_mount_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("/{}", parts.join("/"))
}
