pub mod descriptor;
pub mod devices;
pub mod local;
pub mod registry;

pub use descriptor::{clean_mount_path, DriverKind, ProxyPolicy, StorageDescriptor, StorageId};
pub use devices::{discover, probe_write, StorageDevice};
pub use local::LocalAddition;
pub use registry::RocksRegistry;

use thiserror::Error;

/// Errors raised by storage admission and registry access
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("mount path is empty")]
    EmptyMountPath,

    #[error("mount path already exists: {0}")]
    DuplicateMountPath(String),

    #[error("invalid driver addition: {0}")]
    InvalidAddition(String),

    #[error("storage not found: {0}")]
    NotFound(StorageId),

    #[error("corrupt registry record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
}

/// Set of mounted storages, keyed by unique mount path
///
/// Implementations make each call individually atomic; callers add no locking.
pub trait StorageRegistry: Send + Sync {
    /// Validate and persist a new descriptor, returning its assigned id
    ///
    /// All-or-nothing: a rejected descriptor leaves no trace.
    fn create(&self, storage: StorageDescriptor) -> Result<StorageId, RegistryError>;

    fn get(&self, id: StorageId) -> Result<Option<StorageDescriptor>, RegistryError>;

    fn get_by_mount_path(
        &self,
        mount_path: &str,
    ) -> Result<Option<StorageDescriptor>, RegistryError>;

    /// All descriptors, ordered by `order` then id
    fn list(&self) -> Result<Vec<StorageDescriptor>, RegistryError>;

    /// Number of descriptors, disabled and errored ones included
    fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.list()?.len())
    }

    fn delete(&self, id: StorageId) -> Result<(), RegistryError>;
}
