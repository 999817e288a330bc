use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::xdg;

/// Complete mountkeeper configuration (loaded from TOML file)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MountkeeperConfig {
    #[serde(default)]
    pub flags: ProcessFlags,

    #[serde(default)]
    pub scheme: SchemeConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Process-lifetime flags
///
/// Built once at startup and handed to every component that needs it.
/// Last write wins; none of the setters validate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessFlags {
    /// Data directory (metadata database, log file, init marker)
    #[serde(default = "xdg::data_dir")]
    pub data_dir: PathBuf,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Log to stdout instead of `<data_dir>/log/mountkeeper.log`
    #[serde(default)]
    pub log_std: bool,

    /// Strip the mount prefix from served URLs
    #[serde(default)]
    pub no_prefix: bool,
}

impl Default for ProcessFlags {
    fn default() -> Self {
        Self {
            data_dir: xdg::data_dir(),
            debug: false,
            log_std: false,
            no_prefix: false,
        }
    }
}

impl ProcessFlags {
    pub fn set_data_dir(&mut self, path: impl Into<PathBuf>) {
        self.data_dir = path.into();
    }

    pub fn set_log_std(&mut self, enabled: bool) {
        self.log_std = enabled;
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn set_no_prefix(&mut self, enabled: bool) {
        self.no_prefix = enabled;
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_data_dir(path);
        self
    }

    pub fn with_log_std(mut self, enabled: bool) -> Self {
        self.set_log_std(enabled);
        self
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.set_debug(enabled);
        self
    }

    pub fn with_no_prefix(mut self, enabled: bool) -> Self {
        self.set_no_prefix(enabled);
        self
    }

    /// RocksDB metadata directory
    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    /// Log file used when `log_std` is off
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("log").join("mountkeeper.log")
    }

    /// Marker written once the first-run bootstrap has completed
    pub fn init_marker(&self) -> PathBuf {
        self.data_dir.join(".initialized")
    }
}

/// Listener settings of the aggregation server, used to derive its address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemeConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_http_port")]
    pub http_port: i32,

    /// -1 disables HTTPS
    #[serde(default = "default_https_port")]
    pub https_port: i32,

    #[serde(default)]
    pub force_https: bool,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            http_port: default_http_port(),
            https_port: default_https_port(),
            force_https: false,
        }
    }
}

impl SchemeConfig {
    /// Address clients should use to reach the server
    ///
    /// HTTPS only when it is forced and has a usable port.
    pub fn server_address(&self) -> String {
        if self.force_https && self.https_port != -1 {
            format!("https://{}:{}", self.address, self.https_port)
        } else {
            format!("http://{}:{}", self.address, self.http_port)
        }
    }
}

/// First-run bootstrap settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BootstrapConfig {
    /// Mount path of the primary device
    #[serde(default = "default_primary_mount_path")]
    pub primary_mount_path: String,

    /// Admin password set on first run (a random one is generated when unset)
    #[serde(default)]
    pub default_password: Option<String>,

    /// Root mounted when no device is discovered
    #[serde(default)]
    pub fallback_root: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            primary_mount_path: default_primary_mount_path(),
            default_password: None,
            fallback_root: None,
        }
    }
}

// Default value functions
fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> i32 {
    5244
}

fn default_https_port() -> i32 {
    -1
}

fn default_primary_mount_path() -> String {
    "/".to_string()
}

impl MountkeeperConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: MountkeeperConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Generate example configuration as TOML string
    pub fn example() -> Result<String> {
        let config = MountkeeperConfig {
            flags: ProcessFlags {
                data_dir: PathBuf::from("/var/lib/mountkeeper"),
                debug: false,
                log_std: true,
                no_prefix: false,
            },
            scheme: SchemeConfig {
                address: "0.0.0.0".to_string(),
                http_port: 5244,
                https_port: 5245,
                force_https: false,
            },
            bootstrap: BootstrapConfig {
                primary_mount_path: "/local".to_string(),
                default_password: Some("change-me".to_string()),
                fallback_root: Some(PathBuf::from("/srv/data")),
            },
        };

        toml::to_string_pretty(&config).context("Failed to render example config")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.flags.data_dir.as_os_str().is_empty() {
            anyhow::bail!("flags.data_dir must be set");
        }

        if !(1..=65535).contains(&self.scheme.http_port) {
            anyhow::bail!("scheme.http_port must be between 1 and 65535");
        }

        if self.scheme.https_port != -1 && !(1..=65535).contains(&self.scheme.https_port) {
            anyhow::bail!("scheme.https_port must be -1 or between 1 and 65535");
        }

        if !self.bootstrap.primary_mount_path.starts_with('/') {
            anyhow::bail!("bootstrap.primary_mount_path must start with '/'");
        }

        if let Some(ref password) = self.bootstrap.default_password {
            if password.is_empty() {
                anyhow::bail!("bootstrap.default_password must not be empty when set");
            }
        }

        Ok(())
    }
}
