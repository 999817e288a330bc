mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, GlobalArgs};
use mountkeeper::config::MountkeeperConfig;
use mountkeeper::{config_discovery, logging};

/// Command-line flags win over the config file
fn apply_overrides(config: &mut MountkeeperConfig, global: &GlobalArgs) {
    if let Some(ref dir) = global.data_dir {
        config.flags.set_data_dir(dir);
    }
    if global.debug {
        config.flags.set_debug(true);
    }
    if global.log_std {
        config.flags.set_log_std(true);
    }
    if global.no_prefix {
        config.flags.set_no_prefix(true);
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let mut config = config_discovery::load_config_with_discovery(cli.global.config.as_deref())?;
    apply_overrides(&mut config, &cli.global);

    // Initialize structured logging
    logging::init(&config.flags)?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Storage(args) => commands::storage::run(args, &config),
        Commands::Admin(args) => commands::admin::run(args, &config),
        Commands::Init(args) => commands::init::run(args, &config),
        Commands::Config(args) => commands::config::run(args.command, &config),
        Commands::Address => commands::address::run(&config),
    }
}
