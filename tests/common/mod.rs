// Common test utilities shared across acceptance tests
//
// Every workspace owns a temp directory holding the data directory, the
// config home and any local roots to mount. Nothing is written outside it,
// so tests can run in parallel.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use tempfile::TempDir;

use mountkeeper::auth::{AuthCacheInvalidator, CredentialStore, StoreError, User};

/// Isolated data directory plus a scratch area for local roots
#[allow(dead_code)]
pub struct TestWorkspace {
    temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// Create a directory under the workspace and return its path
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let dir = self.temp_dir.path().join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create dir");
        dir
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join("mountkeeper.toml");
        std::fs::write(&path, content).expect("Failed to write config");
        path
    }

    /// The mountkeeper binary pointed at this workspace
    ///
    /// Runs from the workspace so config discovery never leaves it.
    pub fn mountkeeper(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mountkeeper"));
        cmd.current_dir(self.path())
            .env("MOUNTKEEPER_DATA_DIR", self.data_dir())
            .env("XDG_CONFIG_HOME", self.path().join("config-home"))
            .env_remove("MOUNTKEEPER_CONFIG")
            .env_remove("RUST_LOG")
            .env_remove("MOUNTKEEPER_LOG_FORMAT");
        cmd
    }
}

/// Shared, ordered record of collaborator calls
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

#[allow(dead_code)]
impl CallLog {
    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| **c == call).count()
    }
}

/// Invalidator that only records calls
#[allow(dead_code)]
pub struct RecordingInvalidator {
    log: CallLog,
}

#[allow(dead_code)]
impl RecordingInvalidator {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl AuthCacheInvalidator for RecordingInvalidator {
    fn invalidate_admin(&self) {
        self.log.push("invalidate_admin");
    }

    fn invalidate(&self, _username: &str) {
        self.log.push("invalidate");
    }
}

/// Credential store wrapper that records updates and can refuse them
#[allow(dead_code)]
pub struct RecordingStore {
    inner: Arc<dyn CredentialStore>,
    log: CallLog,
    fail_updates: bool,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new(inner: Arc<dyn CredentialStore>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            fail_updates: false,
        }
    }

    pub fn failing(inner: Arc<dyn CredentialStore>, log: CallLog) -> Self {
        Self {
            inner,
            log,
            fail_updates: true,
        }
    }
}

impl CredentialStore for RecordingStore {
    fn get_admin(&self) -> Result<Option<User>, StoreError> {
        self.log.push("get_admin");
        self.inner.get_admin()
    }

    fn get(&self, id: u64) -> Result<Option<User>, StoreError> {
        self.inner.get(id)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.get_by_username(username)
    }

    fn create_user(&self, user: User) -> Result<User, StoreError> {
        self.inner.create_user(user)
    }

    fn update_user(&self, user: &User) -> Result<(), StoreError> {
        if self.fail_updates {
            self.log.push("update_user_failed");
            return Err(StoreError::Corrupt("storage unavailable".to_string()));
        }
        self.log.push("update_user");
        self.inner.update_user(user)
    }
}
