//! First-run bootstrap: mount discovered devices and set the admin password
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::admin::Admin;
use crate::logging::{operations, status};
use crate::storage::{discover, probe_write, StorageDevice};

/// Outcome of mounting a batch of devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MountReport {
    pub mounted: usize,
    /// Removable devices that failed the write probe
    pub skipped: usize,
    /// Devices the registry rejected
    pub failed: usize,
    pub used_fallback: bool,
}

impl MountReport {
    pub fn attempted(&self) -> usize {
        self.mounted + self.skipped + self.failed
    }
}

/// Mount every device, each attempt independent of the others
///
/// With no devices, `fallback` (if any) is mounted at `primary_mount_path`.
pub fn mount_all(
    admin: &Admin,
    devices: &[StorageDevice],
    primary_mount_path: &str,
    fallback: Option<&Path>,
) -> MountReport {
    let mut report = MountReport::default();

    if devices.is_empty() {
        match fallback {
            Some(root) => {
                report.used_fallback = true;
                let local = root.to_string_lossy();
                match admin.add_local_storage(&local, primary_mount_path) {
                    Ok(_) => report.mounted += 1,
                    Err(_) => report.failed += 1,
                }
            }
            None => warn!(
                operation = operations::BOOTSTRAP,
                status = status::SKIPPED,
                "no storage device found and no fallback root configured"
            ),
        }
        return report;
    }

    for device in devices {
        if device.removable && !probe_write(&device.path) {
            warn!(
                operation = operations::BOOTSTRAP,
                status = status::SKIPPED,
                path = %device.path.display(),
                "skipping read-only removable device"
            );
            report.skipped += 1;
            continue;
        }

        let local = device.path.to_string_lossy();
        match admin.add_local_storage(&local, &device.mount_path(primary_mount_path)) {
            Ok(_) => report.mounted += 1,
            Err(_) => report.failed += 1,
        }
    }

    report
}

impl Admin {
    pub fn is_initialized(&self) -> bool {
        self.flags().init_marker().exists()
    }

    pub fn mark_initialized(&self) -> Result<()> {
        let marker = self.flags().init_marker();
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&marker, b"")
            .with_context(|| format!("Failed to write init marker: {}", marker.display()))
    }

    /// Run the first-run bootstrap once
    ///
    /// Returns `None` when the data directory is already initialized. Device
    /// mount failures are counted in the report; a failed password rotation
    /// aborts before the marker is written, so the next run retries.
    pub fn first_run(
        &self,
        candidates: Vec<StorageDevice>,
        primary_mount_path: &str,
        fallback: Option<&Path>,
        default_password: &str,
    ) -> Result<Option<MountReport>> {
        if self.is_initialized() {
            info!(
                operation = operations::BOOTSTRAP,
                status = status::SKIPPED,
                "data directory already initialized"
            );
            return Ok(None);
        }

        let devices = discover(candidates);
        let report = mount_all(self, &devices, primary_mount_path, fallback);

        self.set_admin_password(default_password)
            .context("Failed to set the initial admin password")?;
        self.mark_initialized()?;

        info!(
            operation = operations::BOOTSTRAP,
            status = status::SUCCESS,
            mounted = report.mounted,
            skipped = report.skipped,
            failed = report.failed,
            "first run complete"
        );
        Ok(Some(report))
    }
}
