use anyhow::Result;
use tracing::info;

use crate::cli::ConfigCommands;
use mountkeeper::config::MountkeeperConfig;

pub fn run(command: ConfigCommands, config: &MountkeeperConfig) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show => show(config),
    }
}

fn validate(path: &str) -> Result<()> {
    info!("Validating config file: {}", path);

    let config = MountkeeperConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path);
    println!("\nSummary:");
    println!("  - Data directory: {}", config.flags.data_dir.display());
    println!("  - Server address: {}", config.scheme.server_address());
    println!(
        "  - Primary mount path: {}",
        config.bootstrap.primary_mount_path
    );
    if let Some(ref root) = config.bootstrap.fallback_root {
        println!("  - Fallback root: {}", root.display());
    }

    Ok(())
}

fn generate() -> Result<()> {
    println!("{}", MountkeeperConfig::example()?);
    Ok(())
}

fn show(config: &MountkeeperConfig) -> Result<()> {
    info!("Showing effective configuration");

    println!("Effective Configuration:\n");
    println!("{}", toml::to_string_pretty(config)?);

    Ok(())
}
