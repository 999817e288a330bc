use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Suffix mixed into the unsalted first hash round
const STATIC_HASH_SALT: &str = "https://github.com/alist-org/alist";

const SALT_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    General,
    Guest,
    Admin,
}

/// An account of the aggregation service
///
/// The secret is only ever held in derived form (`salt` + `pwd_hash`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identity, assigned by the store
    #[serde(default)]
    pub id: u64,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub salt: String,
    #[serde(default)]
    pub pwd_hash: String,
    /// Unix seconds of the last password change
    #[serde(default)]
    pub pwd_ts: i64,
    #[serde(default)]
    pub disabled: bool,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: 0,
            username: username.into(),
            role,
            salt: String::new(),
            pwd_hash: String::new(),
            pwd_ts: 0,
            disabled: false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest
    }

    /// Replace the secret: fresh salt, new hash, bumped `pwd_ts`
    pub fn set_password(&mut self, secret: &str) {
        self.salt = random_string(SALT_LEN);
        self.pwd_hash = hash_password(&static_hash(secret), &self.salt);
        self.pwd_ts = Utc::now().timestamp();
    }

    pub fn validate_password(&self, secret: &str) -> bool {
        !self.pwd_hash.is_empty() && hash_password(&static_hash(secret), &self.salt) == self.pwd_hash
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("pwd_ts", &self.pwd_ts)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// First, unsalted round: what clients may send instead of the cleartext
pub fn static_hash(secret: &str) -> String {
    sha256_hex(&format!("{}-{}", secret, STATIC_HASH_SALT))
}

/// Second round, salted per user
pub fn hash_password(static_hash: &str, salt: &str) -> String {
    sha256_hex(&format!("{}-{}", static_hash, salt))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Random alphanumeric string, used for salts and generated passwords
pub fn random_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
