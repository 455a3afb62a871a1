use tenantbind_core::error::Result;

use async_trait::async_trait;

/// The downstream PostgreSQL operations the reconciler needs. A real implementation
/// talks to the server over `tokio-postgres`/`sqlx`; that client lives outside this crate, same
/// as the Secret-Store's HTTP client lives outside `tenantbind-core`.
#[async_trait]
pub trait PostgresAdapter: Send + Sync {
    async fn database_exists(&self, db: &str) -> Result<bool>;
    async fn user_exists(&self, user: &str) -> Result<bool>;
    async fn create_database(&self, db: &str) -> Result<()>;
    async fn create_user(&self, user: &str, password: &str) -> Result<()>;
    async fn alter_user_password(&self, user: &str, password: &str) -> Result<()>;
    async fn grant_user_on_database(&self, user: &str, db: &str) -> Result<()>;
    /// Whether `readonly_role` already has the default-privilege `SELECT` grant from `grantor`.
    async fn is_readonly_grantee(&self, db: &str, grantor: &str, readonly_role: &str) -> Result<bool>;
    async fn grant_select_to_readonly(&self, db: &str, grantor: &str, readonly_role: &str) -> Result<()>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    /// An in-memory double tracking which databases/users/grants exist, for reconciler tests.
    #[derive(Default)]
    pub struct InMemoryPostgres {
        databases: Mutex<BTreeSet<String>>,
        users: Mutex<BTreeSet<String>>,
        passwords: Mutex<BTreeMap<String, String>>,
        grants: Mutex<BTreeSet<(String, String)>>,
        readonly_grants: Mutex<BTreeSet<(String, String, String)>>,
        pub alter_password_calls: Mutex<u32>,
        pub grant_calls: Mutex<u32>,
        pub readonly_grant_calls: Mutex<u32>,
    }

    impl InMemoryPostgres {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_user(&self, user: &str, password: &str) {
            self.users.lock().unwrap().insert(user.to_string());
            self.passwords
                .lock()
                .unwrap()
                .insert(user.to_string(), password.to_string());
        }

        pub fn seed_database(&self, db: &str) {
            self.databases.lock().unwrap().insert(db.to_string());
        }

        pub fn password_of(&self, user: &str) -> Option<String> {
            self.passwords.lock().unwrap().get(user).cloned()
        }
    }

    #[async_trait]
    impl PostgresAdapter for InMemoryPostgres {
        async fn database_exists(&self, db: &str) -> Result<bool> {
            Ok(self.databases.lock().unwrap().contains(db))
        }

        async fn user_exists(&self, user: &str) -> Result<bool> {
            Ok(self.users.lock().unwrap().contains(user))
        }

        async fn create_database(&self, db: &str) -> Result<()> {
            self.databases.lock().unwrap().insert(db.to_string());
            Ok(())
        }

        async fn create_user(&self, user: &str, password: &str) -> Result<()> {
            self.users.lock().unwrap().insert(user.to_string());
            self.passwords
                .lock()
                .unwrap()
                .insert(user.to_string(), password.to_string());
            Ok(())
        }

        async fn alter_user_password(&self, user: &str, password: &str) -> Result<()> {
            *self.alter_password_calls.lock().unwrap() += 1;
            self.passwords
                .lock()
                .unwrap()
                .insert(user.to_string(), password.to_string());
            Ok(())
        }

        async fn grant_user_on_database(&self, user: &str, db: &str) -> Result<()> {
            *self.grant_calls.lock().unwrap() += 1;
            self.grants
                .lock()
                .unwrap()
                .insert((user.to_string(), db.to_string()));
            Ok(())
        }

        async fn is_readonly_grantee(&self, db: &str, grantor: &str, readonly_role: &str) -> Result<bool> {
            Ok(self
                .readonly_grants
                .lock()
                .unwrap()
                .contains(&(db.to_string(), grantor.to_string(), readonly_role.to_string())))
        }

        async fn grant_select_to_readonly(&self, db: &str, grantor: &str, readonly_role: &str) -> Result<()> {
            *self.readonly_grant_calls.lock().unwrap() += 1;
            self.readonly_grants.lock().unwrap().insert((
                db.to_string(),
                grantor.to_string(),
                readonly_role.to_string(),
            ));
            Ok(())
        }
    }
}
