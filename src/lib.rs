// Library interface for mountkeeper
// The binary and the integration tests both go through these modules

pub mod admin;
pub mod auth;
pub mod cli_utils;
pub mod config;
pub mod config_discovery;
pub mod db;
pub mod first_run;
pub mod logging;
pub mod storage;
pub mod xdg;

// Re-export commonly used types
pub use admin::{
    Admin, AdminError, AdminIdentity, Rotation, Services, FALLBACK_ADMIN_USERNAME,
};
pub use config::{BootstrapConfig, MountkeeperConfig, ProcessFlags, SchemeConfig};
pub use config_discovery::{discover_config, load_config_with_discovery};
pub use first_run::{mount_all, MountReport};
pub use storage::{StorageDescriptor, StorageId, StorageRegistry};
