/// `mountkeeper admin` command implementation
use anyhow::Result;

use crate::cli::{AdminArgs, AdminCommand};
use mountkeeper::admin::AdminIdentity;
use mountkeeper::cli_utils::mountkeeper_prefix;
use mountkeeper::config::MountkeeperConfig;

pub fn run(args: AdminArgs, config: &MountkeeperConfig) -> Result<()> {
    let admin = super::open_admin(&config.flags)?;

    match args.command {
        AdminCommand::Show => {
            let identity = admin.admin_identity();
            println!("{}", identity.display_name());
            if identity == AdminIdentity::NotProvisioned {
                eprintln!("{} No administrator provisioned", mountkeeper_prefix());
            }
        }
        AdminCommand::Set { secret } => {
            let rotation = admin.set_admin_password(&secret)?;
            println!(
                "{} Password updated for {}",
                mountkeeper_prefix(),
                rotation.username
            );
        }
        AdminCommand::Random => {
            let (secret, rotation) = admin.rotate_admin_password()?;
            println!("username: {}", rotation.username);
            println!("password: {}", secret);
        }
    }

    Ok(())
}
