use tenantbind_core::error::Result;

use async_trait::async_trait;

/// The downstream Keycloak admin-API operations the reconciler needs.
#[async_trait]
pub trait KeycloakAdapter: Send + Sync {
    /// Returns the client's internal id if a client with this `client_id` already exists.
    async fn find_client(&self, realm: &str, client_id: &str) -> Result<Option<String>>;
    /// Creates a confidential client, returning its internal id.
    async fn create_client(&self, realm: &str, client_id: &str) -> Result<String>;
    async fn read_client_secret(&self, realm: &str, internal_id: &str) -> Result<String>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryKeycloak {
        clients: Mutex<BTreeMap<String, String>>,
        secrets: Mutex<BTreeMap<String, String>>,
        pub create_client_calls: Mutex<u32>,
    }

    impl InMemoryKeycloak {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed_client(&self, client_id: &str, internal_id: &str, secret: &str) {
            self.clients
                .lock()
                .unwrap()
                .insert(client_id.to_string(), internal_id.to_string());
            self.secrets.lock().unwrap().insert(internal_id.to_string(), secret.to_string());
        }
    }

    #[async_trait]
    impl KeycloakAdapter for InMemoryKeycloak {
        async fn find_client(&self, _realm: &str, client_id: &str) -> Result<Option<String>> {
            Ok(self.clients.lock().unwrap().get(client_id).cloned())
        }

        async fn create_client(&self, _realm: &str, client_id: &str) -> Result<String> {
            *self.create_client_calls.lock().unwrap() += 1;
            let internal_id = format!("internal-{client_id}");
            self.clients
                .lock()
                .unwrap()
                .insert(client_id.to_string(), internal_id.clone());
            self.secrets
                .lock()
                .unwrap()
                .insert(internal_id.clone(), format!("generated-secret-for-{client_id}"));
            Ok(internal_id)
        }

        async fn read_client_secret(&self, _realm: &str, internal_id: &str) -> Result<String> {
            self.secrets
                .lock()
                .unwrap()
                .get(internal_id)
                .cloned()
                .ok_or_else(|| tenantbind_core::error::Error::NonExistSecret(internal_id.to_string()))
        }
    }
}
