/// `mountkeeper init` command implementation
use anyhow::Result;
use std::path::PathBuf;

use crate::cli::InitArgs;
use mountkeeper::auth::user::random_string;
use mountkeeper::cli_utils::mountkeeper_prefix;
use mountkeeper::config::MountkeeperConfig;
use mountkeeper::storage::StorageDevice;

const GENERATED_PASSWORD_LEN: usize = 8;

pub fn run(args: InitArgs, config: &MountkeeperConfig) -> Result<()> {
    let admin = super::open_admin(&config.flags)?;

    let candidates: Vec<StorageDevice> = args
        .devices
        .iter()
        .enumerate()
        .map(|(i, path)| {
            if i == 0 {
                StorageDevice::primary(PathBuf::from(path))
            } else {
                StorageDevice::removable(PathBuf::from(path))
            }
        })
        .collect();

    let password = args
        .password
        .or_else(|| config.bootstrap.default_password.clone())
        .unwrap_or_else(|| random_string(GENERATED_PASSWORD_LEN));

    let report = admin.first_run(
        candidates,
        &config.bootstrap.primary_mount_path,
        config.bootstrap.fallback_root.as_deref(),
        &password,
    )?;

    match report {
        Some(report) => {
            println!(
                "{} Initialized: {} mounted, {} skipped, {} failed",
                mountkeeper_prefix(),
                report.mounted,
                report.skipped,
                report.failed
            );
            println!("username: {}", admin.admin_username());
            println!("password: {}", password);
        }
        None => println!("{} Already initialized", mountkeeper_prefix()),
    }

    Ok(())
}
