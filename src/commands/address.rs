use anyhow::Result;

use mountkeeper::config::MountkeeperConfig;

pub fn run(config: &MountkeeperConfig) -> Result<()> {
    println!("{}", config.scheme.server_address());
    Ok(())
}
