pub mod bootstrap;
pub mod cache;
pub mod store;
pub mod user;

pub use bootstrap::{ensure_users, ADMIN_USERNAME, GUEST_USERNAME};
pub use cache::{AuthCacheInvalidator, AuthError, UserCache};
pub use store::{CredentialStore, RocksUserStore, StoreError};
pub use user::{Role, User};
