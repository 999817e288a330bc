//! RocksDB metadata database shared by the storage registry and the user store
//!
//! Column families:
//! - "storages": storage descriptors keyed by big-endian id (JSON values)
//! - "storage_mounts": unique index mount path -> id
//! - "users": user records keyed by big-endian id (JSON values)
//! - "user_names": unique index username -> id
//! - "meta": id counters
use anyhow::{Context, Result};
use rocksdb::{ColumnFamily, Options, DB};
use std::fs;
use std::path::{Path, PathBuf};

pub const CF_STORAGES: &str = "storages";
pub const CF_STORAGE_MOUNTS: &str = "storage_mounts";
pub const CF_USERS: &str = "users";
pub const CF_USER_NAMES: &str = "user_names";
pub const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_STORAGES,
    CF_STORAGE_MOUNTS,
    CF_USERS,
    CF_USER_NAMES,
    CF_META,
];

/// Handle to the metadata database
///
/// Shared through `Arc` between the registry and the user store; flushed and
/// shut down when the last handle drops.
pub struct Database {
    db: DB,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create metadata directory: {}", path.display()))?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_max_background_jobs(2);

        // Disable statistics to reduce overhead and potential shutdown issues
        opts.set_statistics_level(rocksdb::statistics::StatsLevel::DisableAll);

        let db = DB::open_cf(&opts, path, COLUMN_FAMILIES)
            .with_context(|| format!("Failed to open metadata database: {}", path.display()))?;

        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn raw(&self) -> &DB {
        &self.db
    }

    pub(crate) fn cf(&self, name: &'static str) -> Option<&ColumnFamily> {
        self.db.cf_handle(name)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            tracing::warn!("Failed to flush metadata database on shutdown: {}", e);
        }

        // Required on Linux to avoid pthread lock errors at exit
        self.db.cancel_all_background_work(true);
    }
}

/// Encode an id as a sortable key
pub(crate) fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub(crate) fn decode_u64(bytes: &[u8]) -> Option<u64> {
    let array: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(array))
}
