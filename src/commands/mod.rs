pub mod address;
pub mod admin;
pub mod config;
pub mod init;
pub mod storage;

use anyhow::Result;

use mountkeeper::admin::{Admin, Services};
use mountkeeper::config::ProcessFlags;

/// Open the metadata database and build the facade over it
pub(crate) fn open_admin(flags: &ProcessFlags) -> Result<Admin> {
    let services = Services::open(flags)?;
    Ok(Admin::from_services(flags.clone(), &services))
}
