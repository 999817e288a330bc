use rocksdb::{IteratorMode, WriteBatch};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::user::{Role, User};
use crate::db::{self, Database, CF_META, CF_USERS, CF_USER_NAMES};

const NEXT_ID_KEY: &[u8] = b"users.next_id";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("user not found: {0}")]
    NotFound(u64),

    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("an administrator already exists: {0}")]
    AdminExists(String),

    #[error("corrupt user record: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
}

/// Persistence of accounts and their derived credentials
pub trait CredentialStore: Send + Sync {
    /// The unique account holding the admin role, if any
    fn get_admin(&self) -> Result<Option<User>, StoreError>;

    fn get(&self, id: u64) -> Result<Option<User>, StoreError>;

    fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Persist a new account and return it with its assigned id
    fn create_user(&self, user: User) -> Result<User, StoreError>;

    /// Overwrite the account with `user.id`
    fn update_user(&self, user: &User) -> Result<(), StoreError>;
}

/// User store persisted in the metadata database
///
/// "users" holds JSON records keyed by big-endian id, "user_names" is the
/// unique username index. Mutations are serialized by a lock; each one is a
/// single write batch.
pub struct RocksUserStore {
    db: Arc<Database>,
    write_lock: Mutex<()>,
}

impl RocksUserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            write_lock: Mutex::new(()),
        }
    }

    fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf(name)
            .ok_or_else(|| StoreError::Corrupt(format!("missing column family {}", name)))
    }

    fn decode(bytes: &[u8]) -> Result<User, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn encode(user: &User) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(user).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn all(&self) -> Result<Vec<User>, StoreError> {
        let users = self.cf(CF_USERS)?;
        let mut result = Vec::new();
        for item in self.db.raw().iterator_cf(users, IteratorMode::Start) {
            let (_, value) = item?;
            result.push(Self::decode(&value)?);
        }
        Ok(result)
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        let meta = self.cf(CF_META)?;
        match self.db.raw().get_cf(meta, NEXT_ID_KEY)? {
            Some(bytes) => db::decode_u64(&bytes)
                .ok_or_else(|| StoreError::Corrupt("user id counter".to_string())),
            None => Ok(1),
        }
    }

    fn other_admin(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.get_admin()?.filter(|admin| admin.id != id))
    }
}

impl CredentialStore for RocksUserStore {
    fn get_admin(&self) -> Result<Option<User>, StoreError> {
        Ok(self.all()?.into_iter().find(|u| u.role == Role::Admin))
    }

    fn get(&self, id: u64) -> Result<Option<User>, StoreError> {
        let users = self.cf(CF_USERS)?;
        match self.db.raw().get_cf(users, db::id_key(id))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let names = self.cf(CF_USER_NAMES)?;
        match self.db.raw().get_cf(names, username.as_bytes())? {
            Some(bytes) => {
                let id = db::decode_u64(&bytes)
                    .ok_or_else(|| StoreError::Corrupt(format!("username index {}", username)))?;
                self.get(id)
            }
            None => Ok(None),
        }
    }

    fn create_user(&self, mut user: User) -> Result<User, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let names = self.cf(CF_USER_NAMES)?;
        if self.db.raw().get_cf(names, user.username.as_bytes())?.is_some() {
            return Err(StoreError::DuplicateUsername(user.username));
        }
        if user.is_admin() {
            if let Some(admin) = self.get_admin()? {
                return Err(StoreError::AdminExists(admin.username));
            }
        }

        user.id = self.next_id()?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_USERS)?, db::id_key(user.id), Self::encode(&user)?);
        batch.put_cf(names, user.username.as_bytes(), db::id_key(user.id));
        batch.put_cf(self.cf(CF_META)?, NEXT_ID_KEY, db::id_key(user.id + 1));
        self.db.raw().write(batch)?;

        Ok(user)
    }

    fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let existing = self.get(user.id)?.ok_or(StoreError::NotFound(user.id))?;

        if user.is_admin() {
            if let Some(admin) = self.other_admin(user.id)? {
                return Err(StoreError::AdminExists(admin.username));
            }
        }

        let names = self.cf(CF_USER_NAMES)?;
        let mut batch = WriteBatch::default();
        if existing.username != user.username {
            if self.db.raw().get_cf(names, user.username.as_bytes())?.is_some() {
                return Err(StoreError::DuplicateUsername(user.username.clone()));
            }
            batch.delete_cf(names, existing.username.as_bytes());
            batch.put_cf(names, user.username.as_bytes(), db::id_key(user.id));
        }
        batch.put_cf(self.cf(CF_USERS)?, db::id_key(user.id), Self::encode(user)?);
        self.db.raw().write(batch)?;

        Ok(())
    }
}
