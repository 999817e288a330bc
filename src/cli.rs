use clap::{Parser, Subcommand};

/// Mountkeeper - administration for a storage-aggregation service
///
/// Mounts local directories as storages, rotates the administrator
/// credential and bootstraps a fresh data directory.
#[derive(Parser, Debug)]
#[command(name = "mountkeeper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Storage mount and credential administration", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Process-wide flags, applied on top of the config file
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file path
    #[arg(short = 'c', long, global = true, env = "MOUNTKEEPER_CONFIG")]
    pub config: Option<String>,

    /// Data directory (metadata database, logs, init marker)
    #[arg(long, global = true, env = "MOUNTKEEPER_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "MOUNTKEEPER_DEBUG")]
    pub debug: bool,

    /// Log to stdout instead of the log file
    #[arg(long, global = true, env = "MOUNTKEEPER_LOG_STD")]
    pub log_std: bool,

    /// Strip the mount prefix from served URLs
    #[arg(long, global = true, env = "MOUNTKEEPER_NO_PREFIX")]
    pub no_prefix: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mount and inspect storages
    Storage(StorageArgs),

    /// Administrator account management
    Admin(AdminArgs),

    /// Run the first-run bootstrap
    Init(InitArgs),

    /// Configuration management utilities
    Config(ConfigArgs),

    /// Print the server address derived from the config
    Address,
}

#[derive(Parser, Debug)]
pub struct StorageArgs {
    #[command(subcommand)]
    pub command: StorageCommand,
}

#[derive(Subcommand, Debug)]
pub enum StorageCommand {
    /// Mount a local directory
    Add {
        /// Local directory to expose
        local_path: String,

        /// Mount path inside the service (e.g. /local)
        mount_path: String,
    },

    /// Print the number of mounted storages
    Count {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List mounted storages
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Print the administrator username
    Show,

    /// Set the administrator password
    Set {
        /// New password
        secret: String,
    },

    /// Set a random administrator password and print it
    Random,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Device directory to mount; the first one is the primary device
    #[arg(long = "device")]
    pub devices: Vec<String>,

    /// Initial admin password (overrides bootstrap.default_password)
    #[arg(long, env = "MOUNTKEEPER_DEFAULT_PASSWORD")]
    pub password: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Validate {
        /// Path to config file
        path: String,
    },
    /// Generate example config file
    Generate,
    /// Show effective configuration (file + command-line overrides)
    Show,
}
