//! Administration facade over the storage registry and the credential store
//!
//! Every operation returns a `Result` and logs its outcome. Callers that only
//! want the log (fire-and-forget) use [`Admin::mount_local_storage`] or drop
//! the error themselves.
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::auth::{
    ensure_users, AuthCacheInvalidator, CredentialStore, RocksUserStore, StoreError, UserCache,
};
use crate::config::ProcessFlags;
use crate::db::Database;
use crate::logging::{operations, status};
use crate::storage::{
    clean_mount_path, DriverKind, LocalAddition, ProxyPolicy, RegistryError, RocksRegistry,
    StorageDescriptor, StorageId, StorageRegistry,
};

/// Username reported when no administrator is provisioned
pub const FALLBACK_ADMIN_USERNAME: &str = "admin";

const RANDOM_PASSWORD_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("administrator account not found")]
    AdminNotFound,

    #[error("failed to look up administrator: {0}")]
    Lookup(#[source] StoreError),

    #[error("failed to mount local storage: {0}")]
    StorageAdmission(#[source] RegistryError),

    #[error("failed to update administrator: {0}")]
    Persistence(#[source] StoreError),

    #[error("failed to read storage registry: {0}")]
    Inventory(#[source] RegistryError),
}

/// Outcome of the administrator identity query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminIdentity {
    Provisioned(String),
    /// No admin account exists, or the lookup failed (logged)
    NotProvisioned,
}

impl AdminIdentity {
    pub fn is_provisioned(&self) -> bool {
        matches!(self, AdminIdentity::Provisioned(_))
    }

    /// Username, or [`FALLBACK_ADMIN_USERNAME`] when not provisioned
    pub fn display_name(&self) -> &str {
        match self {
            AdminIdentity::Provisioned(username) => username,
            AdminIdentity::NotProvisioned => FALLBACK_ADMIN_USERNAME,
        }
    }
}

/// Result of a successful credential rotation
#[derive(Debug, Clone)]
pub struct Rotation {
    pub username: String,
    /// `pwd_ts` written with the new credential
    pub pwd_ts: i64,
    /// Time between the credential becoming durable and the auth cache
    /// being cleared; a concurrent login may still see the old secret
    /// during this window
    pub invalidation_lag: Duration,
}

/// Concrete collaborators backed by the metadata database
pub struct Services {
    pub db: Arc<Database>,
    pub registry: Arc<RocksRegistry>,
    pub users: Arc<RocksUserStore>,
    pub sessions: Arc<UserCache>,
}

impl Services {
    /// Open the metadata database under `flags.data_dir` and make sure the
    /// built-in accounts exist
    pub fn open(flags: &ProcessFlags) -> anyhow::Result<Self> {
        let db = Arc::new(Database::open(flags.metadata_dir())?);
        let registry = Arc::new(RocksRegistry::new(Arc::clone(&db)));
        let users = Arc::new(RocksUserStore::new(Arc::clone(&db)));
        let sessions = Arc::new(UserCache::new(users.clone()));

        ensure_users(users.as_ref()).context("Failed to provision built-in users")?;

        Ok(Self {
            db,
            registry,
            users,
            sessions,
        })
    }
}

/// Mount path as the registry stores it; an empty one is logged as given
fn logged_mount_path(mount_path: &str) -> String {
    if mount_path.trim().is_empty() {
        mount_path.to_string()
    } else {
        clean_mount_path(mount_path)
    }
}

pub struct Admin {
    flags: ProcessFlags,
    registry: Arc<dyn StorageRegistry>,
    credentials: Arc<dyn CredentialStore>,
    auth_cache: Arc<dyn AuthCacheInvalidator>,
}

impl Admin {
    pub fn new(
        flags: ProcessFlags,
        registry: Arc<dyn StorageRegistry>,
        credentials: Arc<dyn CredentialStore>,
        auth_cache: Arc<dyn AuthCacheInvalidator>,
    ) -> Self {
        Self {
            flags,
            registry,
            credentials,
            auth_cache,
        }
    }

    pub fn from_services(flags: ProcessFlags, services: &Services) -> Self {
        Self::new(
            flags,
            services.registry.clone(),
            services.users.clone(),
            services.sessions.clone(),
        )
    }

    pub fn flags(&self) -> &ProcessFlags {
        &self.flags
    }

    /// Number of mounted storages, disabled and errored ones included
    pub fn storage_count(&self) -> Result<usize, AdminError> {
        self.registry.count().map_err(|e| {
            error!(
                operation = operations::STORAGE_COUNT,
                status = status::ERROR,
                "failed to count storages: {}",
                e
            );
            AdminError::Inventory(e)
        })
    }

    pub fn storages(&self) -> Result<Vec<StorageDescriptor>, AdminError> {
        self.registry.list().map_err(AdminError::Inventory)
    }

    /// Descriptor used to mount a trusted local path
    ///
    /// Native proxying, no link signing, hidden files shown, no thumbnails,
    /// `777` directories and permanent deletes.
    pub fn local_storage_descriptor(
        local_path: &str,
        mount_path: &str,
    ) -> Result<StorageDescriptor, RegistryError> {
        let addition = LocalAddition::permissive(local_path).to_json()?;
        let mut storage = StorageDescriptor::new(DriverKind::Local, mount_path, addition);
        storage.proxy = ProxyPolicy::NativeProxy;
        storage.enable_sign = false;
        Ok(storage)
    }

    /// Mount `local_path` at `mount_path`
    ///
    /// Neither path is checked here; the registry does all validation and
    /// rejects duplicate mount paths. No retries.
    pub fn add_local_storage(
        &self,
        local_path: &str,
        mount_path: &str,
    ) -> Result<StorageId, AdminError> {
        let result = Self::local_storage_descriptor(local_path, mount_path)
            .and_then(|storage| self.registry.create(storage));
        let mount_path = logged_mount_path(mount_path);

        match result {
            Ok(id) => {
                info!(
                    operation = operations::STORAGE_CREATE,
                    status = status::SUCCESS,
                    mount_path = %mount_path,
                    storage_id = id,
                    "success: mount local storage [{}] with id:{}, path:{}",
                    mount_path,
                    id,
                    local_path
                );
                Ok(id)
            }
            Err(e) => {
                error!(
                    operation = operations::STORAGE_CREATE,
                    status = status::ERROR,
                    mount_path = %mount_path,
                    "failed to mount local storage: {}",
                    e
                );
                Err(AdminError::StorageAdmission(e))
            }
        }
    }

    /// [`Admin::add_local_storage`] with the error only logged
    pub fn mount_local_storage(&self, local_path: &str, mount_path: &str) {
        let _ = self.add_local_storage(local_path, mount_path);
    }

    /// Replace the administrator secret and invalidate cached auth state
    ///
    /// Order: fetch, set, persist by id, invalidate. If persisting fails the
    /// cache is left alone, since the old secret is still the durable one.
    /// The new secret is logged in cleartext for provisioning output.
    pub fn set_admin_password(&self, secret: &str) -> Result<Rotation, AdminError> {
        let mut admin = match self.credentials.get_admin() {
            Ok(Some(admin)) => admin,
            Ok(None) => {
                error!(
                    operation = operations::ADMIN_GET,
                    status = status::NOT_FOUND,
                    "failed get admin user: not found"
                );
                return Err(AdminError::AdminNotFound);
            }
            Err(e) => {
                error!(
                    operation = operations::ADMIN_GET,
                    status = status::ERROR,
                    "failed get admin user: {}",
                    e
                );
                return Err(AdminError::Lookup(e));
            }
        };

        admin.set_password(secret);

        if let Err(e) = self.credentials.update_user(&admin) {
            error!(
                operation = operations::ADMIN_SET_PASSWORD,
                status = status::ERROR,
                username = %admin.username,
                "failed update admin user: {}",
                e
            );
            return Err(AdminError::Persistence(e));
        }
        let persisted_at = Instant::now();

        self.auth_cache.invalidate_admin();
        let invalidation_lag = persisted_at.elapsed();

        info!(
            operation = operations::ADMIN_SET_PASSWORD,
            status = status::SUCCESS,
            username = %admin.username,
            "admin user has been updated:"
        );
        info!("username: {}", admin.username);
        info!("password: {}", secret);

        Ok(Rotation {
            username: admin.username,
            pwd_ts: admin.pwd_ts,
            invalidation_lag,
        })
    }

    /// Rotate to a freshly generated secret, returned alongside the rotation
    pub fn rotate_admin_password(&self) -> Result<(String, Rotation), AdminError> {
        let secret = crate::auth::user::random_string(RANDOM_PASSWORD_LEN);
        let rotation = self.set_admin_password(&secret)?;
        Ok((secret, rotation))
    }

    pub fn admin_identity(&self) -> AdminIdentity {
        match self.credentials.get_admin() {
            Ok(Some(admin)) => AdminIdentity::Provisioned(admin.username),
            Ok(None) => {
                warn!(
                    operation = operations::ADMIN_GET,
                    status = status::NOT_FOUND,
                    "no admin user provisioned"
                );
                AdminIdentity::NotProvisioned
            }
            Err(e) => {
                error!(
                    operation = operations::ADMIN_GET,
                    status = status::ERROR,
                    "failed get admin user: {}",
                    e
                );
                AdminIdentity::NotProvisioned
            }
        }
    }

    /// Administrator username, or `"admin"` when none is provisioned
    pub fn admin_username(&self) -> String {
        self.admin_identity().display_name().to_string()
    }
}
