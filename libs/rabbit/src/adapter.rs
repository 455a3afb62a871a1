use tenantbind_core::error::Result;

use async_trait::async_trait;

/// The downstream RabbitMQ management-API operations the reconciler needs.
///
/// `user_vhost_permissions_exist` and `create_user_vhost_permissions` both take `vhost`
/// explicitly, not a hardcoded name — a shared instance hosts more than one vhost, and permission
/// checks have to be scoped to the one the intent actually names.
#[async_trait]
pub trait RabbitAdapter: Send + Sync {
    async fn user_exists(&self, user: &str) -> Result<bool>;
    async fn create_user(&self, user: &str, password: &str) -> Result<()>;
    async fn vhost_exists(&self, vhost: &str) -> Result<bool>;
    async fn create_vhost(&self, vhost: &str) -> Result<()>;
    async fn user_vhost_permissions_exist(&self, user: &str, vhost: &str) -> Result<bool>;
    async fn create_user_vhost_permissions(&self, user: &str, vhost: &str) -> Result<()>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryRabbit {
        users: Mutex<BTreeSet<String>>,
        vhosts: Mutex<BTreeSet<String>>,
        permissions: Mutex<BTreeSet<(String, String)>>,
        pub create_user_calls: Mutex<u32>,
        pub create_vhost_calls: Mutex<u32>,
        pub create_permission_calls: Mutex<u32>,
    }

    impl InMemoryRabbit {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_user(&self, user: &str) {
            self.users.lock().unwrap().insert(user.to_string());
        }

        pub fn seed_vhost(&self, vhost: &str) {
            self.vhosts.lock().unwrap().insert(vhost.to_string());
        }

        pub fn seed_permission(&self, user: &str, vhost: &str) {
            self.permissions
                .lock()
                .unwrap()
                .insert((user.to_string(), vhost.to_string()));
        }
    }

    #[async_trait]
    impl RabbitAdapter for InMemoryRabbit {
        async fn user_exists(&self, user: &str) -> Result<bool> {
            Ok(self.users.lock().unwrap().contains(user))
        }

        async fn create_user(&self, user: &str, _password: &str) -> Result<()> {
            *self.create_user_calls.lock().unwrap() += 1;
            self.users.lock().unwrap().insert(user.to_string());
            Ok(())
        }

        async fn vhost_exists(&self, vhost: &str) -> Result<bool> {
            Ok(self.vhosts.lock().unwrap().contains(vhost))
        }

        async fn create_vhost(&self, vhost: &str) -> Result<()> {
            *self.create_vhost_calls.lock().unwrap() += 1;
            self.vhosts.lock().unwrap().insert(vhost.to_string());
            Ok(())
        }

        async fn user_vhost_permissions_exist(&self, user: &str, vhost: &str) -> Result<bool> {
            Ok(self
                .permissions
                .lock()
                .unwrap()
                .contains(&(user.to_string(), vhost.to_string())))
        }

        async fn create_user_vhost_permissions(&self, user: &str, vhost: &str) -> Result<()> {
            *self.create_permission_calls.lock().unwrap() += 1;
            self.permissions
                .lock()
                .unwrap()
                .insert((user.to_string(), vhost.to_string()));
            Ok(())
        }
    }
}
