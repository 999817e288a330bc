use chrono::Utc;
use rocksdb::{IteratorMode, WriteBatch};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::descriptor::{clean_mount_path, StorageDescriptor, StorageId};
use super::{RegistryError, StorageRegistry};
use crate::db::{self, Database, CF_META, CF_STORAGES, CF_STORAGE_MOUNTS};

const NEXT_ID_KEY: &[u8] = b"storages.next_id";

/// Storage registry persisted in the metadata database
///
/// Descriptors live in the "storages" column family; "storage_mounts" is a
/// unique index from mount path to id. Creation checks the index and writes
/// descriptor, index entry and id counter in one batch, under a lock so two
/// concurrent creations of the same mount path cannot both pass the check.
pub struct RocksRegistry {
    db: Arc<Database>,
    write_lock: Mutex<()>,
}

impl RocksRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily, RegistryError> {
        self.db
            .cf(name)
            .ok_or_else(|| RegistryError::Corrupt(format!("missing column family {}", name)))
    }

    fn next_id(&self) -> Result<StorageId, RegistryError> {
        let meta = self.cf(CF_META)?;
        match self.db.raw().get_cf(meta, NEXT_ID_KEY)? {
            Some(bytes) => db::decode_u64(&bytes)
                .ok_or_else(|| RegistryError::Corrupt("storage id counter".to_string())),
            None => Ok(1),
        }
    }

    fn decode(bytes: &[u8]) -> Result<StorageDescriptor, RegistryError> {
        serde_json::from_slice(bytes).map_err(|e| RegistryError::Corrupt(e.to_string()))
    }

    fn encode(storage: &StorageDescriptor) -> Result<Vec<u8>, RegistryError> {
        serde_json::to_vec(storage).map_err(|e| RegistryError::Corrupt(e.to_string()))
    }
}

impl StorageRegistry for RocksRegistry {
    fn create(&self, mut storage: StorageDescriptor) -> Result<StorageId, RegistryError> {
        if storage.mount_path.trim().is_empty() {
            return Err(RegistryError::EmptyMountPath);
        }
        storage.mount_path = clean_mount_path(&storage.mount_path);

        storage.driver.validate_addition(&storage.addition)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mounts = self.cf(CF_STORAGE_MOUNTS)?;
        if self
            .db
            .raw()
            .get_cf(mounts, storage.mount_path.as_bytes())?
            .is_some()
        {
            return Err(RegistryError::DuplicateMountPath(storage.mount_path));
        }

        let id = self.next_id()?;
        storage.id = id;
        storage.status = storage.driver.probe(&storage.addition);
        storage.modified = Utc::now();

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_STORAGES)?, db::id_key(id), Self::encode(&storage)?);
        batch.put_cf(mounts, storage.mount_path.as_bytes(), db::id_key(id));
        batch.put_cf(self.cf(CF_META)?, NEXT_ID_KEY, db::id_key(id + 1));
        self.db.raw().write(batch)?;

        debug!(
            storage_id = id,
            mount_path = %storage.mount_path,
            status = %storage.status,
            "storage descriptor written"
        );

        Ok(id)
    }

    fn get(&self, id: StorageId) -> Result<Option<StorageDescriptor>, RegistryError> {
        let storages = self.cf(CF_STORAGES)?;
        match self.db.raw().get_cf(storages, db::id_key(id))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_by_mount_path(
        &self,
        mount_path: &str,
    ) -> Result<Option<StorageDescriptor>, RegistryError> {
        let mounts = self.cf(CF_STORAGE_MOUNTS)?;
        let key = clean_mount_path(mount_path);
        match self.db.raw().get_cf(mounts, key.as_bytes())? {
            Some(bytes) => {
                let id = db::decode_u64(&bytes)
                    .ok_or_else(|| RegistryError::Corrupt(format!("mount index {}", key)))?;
                self.get(id)
            }
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<StorageDescriptor>, RegistryError> {
        let storages = self.cf(CF_STORAGES)?;
        let mut result = Vec::new();

        for item in self.db.raw().iterator_cf(storages, IteratorMode::Start) {
            let (_, value) = item?;
            result.push(Self::decode(&value)?);
        }

        // Keys are big-endian ids, so the iterator already yields id order
        result.sort_by_key(|s| s.order);
        Ok(result)
    }

    fn count(&self) -> Result<usize, RegistryError> {
        let storages = self.cf(CF_STORAGES)?;
        let mut count = 0;
        for item in self.db.raw().iterator_cf(storages, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn delete(&self, id: StorageId) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let storage = self.get(id)?.ok_or(RegistryError::NotFound(id))?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_STORAGES)?, db::id_key(id));
        batch.delete_cf(self.cf(CF_STORAGE_MOUNTS)?, storage.mount_path.as_bytes());
        self.db.raw().write(batch)?;

        Ok(())
    }
}
