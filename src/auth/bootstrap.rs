use tracing::info;

use super::store::{CredentialStore, StoreError};
use super::user::{random_string, Role, User};

pub const ADMIN_USERNAME: &str = "admin";
pub const GUEST_USERNAME: &str = "guest";

const GENERATED_PASSWORD_LEN: usize = 8;

/// Create the built-in accounts when they are missing
///
/// The admin gets a random password, which is logged once and returned. The
/// guest account is created disabled and without a password. Returns `None`
/// when an admin already existed.
pub fn ensure_users(store: &dyn CredentialStore) -> Result<Option<String>, StoreError> {
    let generated = if store.get_admin()?.is_none() {
        let password = random_string(GENERATED_PASSWORD_LEN);
        let mut admin = User::new(ADMIN_USERNAME, Role::Admin);
        admin.set_password(&password);
        let admin = store.create_user(admin)?;
        info!(
            username = %admin.username,
            "Successfully created the admin user and the initial password is: {}",
            password
        );
        Some(password)
    } else {
        None
    };

    if store.get_by_username(GUEST_USERNAME)?.is_none() {
        let mut guest = User::new(GUEST_USERNAME, Role::Guest);
        guest.disabled = true;
        store.create_user(guest)?;
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::RocksUserStore;
    use crate::db::Database;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_users_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::open(temp_dir.path().join("metadata")).unwrap());
        let store = RocksUserStore::new(db);

        let password = ensure_users(&store).unwrap().unwrap();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);

        let admin = store.get_admin().unwrap().unwrap();
        assert_eq!(admin.username, ADMIN_USERNAME);
        assert!(admin.validate_password(&password));

        let guest = store.get_by_username(GUEST_USERNAME).unwrap().unwrap();
        assert!(guest.disabled);
        assert!(guest.is_guest());

        assert!(ensure_users(&store).unwrap().is_none());
        let admin_again = store.get_admin().unwrap().unwrap();
        assert_eq!(admin_again, admin);
    }
}
