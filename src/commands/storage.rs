/// `mountkeeper storage` command implementation
use anyhow::Result;
use serde::Serialize;

use crate::cli::{StorageArgs, StorageCommand};
use mountkeeper::cli_utils::mountkeeper_prefix;
use mountkeeper::config::MountkeeperConfig;
use mountkeeper::storage::StorageDescriptor;

#[derive(Serialize)]
struct CountOutput {
    count: usize,
}

#[derive(Serialize)]
struct StorageOutput<'a> {
    id: u64,
    mount_path: &'a str,
    driver: &'a str,
    root: Option<String>,
    status: &'a str,
    disabled: bool,
}

impl<'a> From<&'a StorageDescriptor> for StorageOutput<'a> {
    fn from(storage: &'a StorageDescriptor) -> Self {
        Self {
            id: storage.id,
            mount_path: &storage.mount_path,
            driver: storage.driver.as_str(),
            root: storage
                .local_addition()
                .ok()
                .map(|addition| addition.root_folder_path),
            status: &storage.status,
            disabled: storage.disabled,
        }
    }
}

pub fn run(args: StorageArgs, config: &MountkeeperConfig) -> Result<()> {
    let admin = super::open_admin(&config.flags)?;

    match args.command {
        StorageCommand::Add {
            local_path,
            mount_path,
        } => {
            let id = admin.add_local_storage(&local_path, &mount_path)?;
            println!(
                "{} Mounted {} at {} (id {})",
                mountkeeper_prefix(),
                local_path,
                mount_path,
                id
            );
        }
        StorageCommand::Count { json } => {
            let count = admin.storage_count()?;
            if json {
                println!("{}", serde_json::to_string(&CountOutput { count })?);
            } else {
                println!("{}", count);
            }
        }
        StorageCommand::List { json } => {
            let storages = admin.storages()?;
            let rows: Vec<StorageOutput> = storages.iter().map(StorageOutput::from).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("{} No storages mounted", mountkeeper_prefix());
            } else {
                for row in rows {
                    println!(
                        "{:>4}  {:<20} {:<8} {:<10} {}",
                        row.id,
                        row.mount_path,
                        row.driver,
                        if row.disabled { "disabled" } else { row.status },
                        row.root.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }

    Ok(())
}
