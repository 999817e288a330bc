use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::logging::operations;

use super::store::{CredentialStore, StoreError};
use super::user::User;

/// Drops cached authentication state after a credential change
///
/// Both calls are idempotent: invalidating an absent entry is a no-op.
pub trait AuthCacheInvalidator: Send + Sync {
    /// Drop every cached entry of the administrator account
    fn invalidate_admin(&self);

    fn invalidate(&self, username: &str);
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled: {0}")]
    Disabled(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cache of user records consulted on every authentication
///
/// A hit skips the store, so an entry must be dropped whenever its record
/// changes; otherwise the old secret keeps authenticating.
///
/// Every invalidation bumps `generation` under the write lock. A miss only
/// fills the cache if no invalidation ran while it was reading the store, so
/// a record read before a rotation is never cached after it.
pub struct UserCache {
    store: Arc<dyn CredentialStore>,
    entries: RwLock<HashMap<String, User>>,
    generation: AtomicU64,
}

impl UserCache {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Look up a user, filling the cache on miss
    pub fn get_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        if let Some(user) = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(username)
        {
            return Ok(Some(user.clone()));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let user = self.store.get_by_username(username)?;
        if let Some(ref user) = user {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            if self.generation.load(Ordering::Acquire) == generation {
                entries.insert(username.to_string(), user.clone());
            } else {
                debug!(username = %username, "record read before invalidation, not cached");
            }
        }
        Ok(user)
    }

    /// Check a username and cleartext secret against the cached record
    pub fn authenticate(&self, username: &str, secret: &str) -> Result<User, AuthError> {
        let user = self
            .get_user(username)?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.disabled {
            return Err(AuthError::Disabled(user.username));
        }
        if !user.validate_password(secret) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    pub fn is_cached(&self, username: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuthCacheInvalidator for UserCache {
    fn invalidate_admin(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = entries.len();
        entries.retain(|_, user| !user.is_admin());
        debug!(
            operation = operations::CACHE_INVALIDATE,
            dropped = before - entries.len(),
            "admin cache entries invalidated"
        );
    }

    fn invalidate(&self, username: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::RocksUserStore;
    use crate::auth::user::Role;
    use crate::db::Database;
    use std::sync::atomic::AtomicBool;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    /// Store that rewrites the password while the first lookup is in flight
    struct RotatingStore {
        inner: Arc<RocksUserStore>,
        cache: OnceLock<Arc<UserCache>>,
        rotated: AtomicBool,
    }

    impl CredentialStore for RotatingStore {
        fn get_admin(&self) -> Result<Option<User>, StoreError> {
            self.inner.get_admin()
        }

        fn get(&self, id: u64) -> Result<Option<User>, StoreError> {
            self.inner.get(id)
        }

        fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            let user = self.inner.get_by_username(username)?;
            if !self.rotated.swap(true, Ordering::SeqCst) {
                if let Some(mut current) = user.clone() {
                    current.set_password("new");
                    self.inner.update_user(&current)?;
                    if let Some(cache) = self.cache.get() {
                        cache.invalidate_admin();
                    }
                }
            }
            Ok(user)
        }

        fn create_user(&self, user: User) -> Result<User, StoreError> {
            self.inner.create_user(user)
        }

        fn update_user(&self, user: &User) -> Result<(), StoreError> {
            self.inner.update_user(user)
        }
    }

    fn setup() -> (TempDir, Arc<RocksUserStore>, UserCache) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(temp_dir.path().join("metadata")).unwrap());
        let store = Arc::new(RocksUserStore::new(db));
        let cache = UserCache::new(store.clone());
        (temp_dir, store, cache)
    }

    #[test]
    fn test_stale_entry_until_invalidated() {
        let (_temp, store, cache) = setup();

        let mut admin = User::new("admin", Role::Admin);
        admin.set_password("old");
        let mut admin = store.create_user(admin).unwrap();

        assert!(cache.authenticate("admin", "old").is_ok());
        assert!(cache.is_cached("admin"));

        admin.set_password("new");
        store.update_user(&admin).unwrap();

        // Cached record still carries the old hash
        assert!(cache.authenticate("admin", "old").is_ok());
        assert!(cache.authenticate("admin", "new").is_err());

        cache.invalidate_admin();
        assert!(!cache.is_cached("admin"));
        assert!(cache.authenticate("admin", "new").is_ok());
        assert!(matches!(
            cache.authenticate("admin", "old"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_lookup_racing_invalidation_is_not_cached() {
        let (_temp, inner, _) = setup();
        let mut admin = User::new("admin", Role::Admin);
        admin.set_password("old");
        inner.create_user(admin).unwrap();

        let store = Arc::new(RotatingStore {
            inner,
            cache: OnceLock::new(),
            rotated: AtomicBool::new(false),
        });
        let cache = Arc::new(UserCache::new(store.clone()));
        let _ = store.cache.set(cache.clone());

        // In-flight lookup returns the record it read before the rotation
        let in_flight = cache.get_user("admin").unwrap().unwrap();
        assert!(in_flight.validate_password("old"));
        assert!(!cache.is_cached("admin"));

        assert!(matches!(
            cache.authenticate("admin", "old"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(cache.authenticate("admin", "new").is_ok());
        assert!(cache.is_cached("admin"));
    }

    #[test]
    fn test_invalidate_admin_keeps_other_users() {
        let (_temp, store, cache) = setup();

        let mut alice = User::new("alice", Role::General);
        alice.set_password("pw");
        store.create_user(alice).unwrap();
        let mut admin = User::new("admin", Role::Admin);
        admin.set_password("pw");
        store.create_user(admin).unwrap();

        cache.get_user("alice").unwrap();
        cache.get_user("admin").unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_admin();
        assert!(cache.is_cached("alice"));
        assert!(!cache.is_cached("admin"));
    }

    #[test]
    fn test_invalidation_is_idempotent() {
        let (_temp, _store, cache) = setup();
        cache.invalidate_admin();
        cache.invalidate_admin();
        cache.invalidate("nobody");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_user_rejected() {
        let (_temp, store, cache) = setup();

        let mut guest = User::new("guest", Role::Guest);
        guest.set_password("pw");
        guest.disabled = true;
        store.create_user(guest).unwrap();

        assert!(matches!(
            cache.authenticate("guest", "pw"),
            Err(AuthError::Disabled(_))
        ));
    }

    #[test]
    fn test_unknown_user_not_cached() {
        let (_temp, _store, cache) = setup();
        assert!(matches!(
            cache.authenticate("nobody", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(cache.is_empty());
    }
}
