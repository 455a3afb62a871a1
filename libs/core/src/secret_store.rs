use crate::error::{Error, Result};

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info};

/// A resolved `vault:<mount>/data/<subpath>[#<key>]` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRef {
    pub mount: String,
    pub subpath: String,
    pub key: Option<String>,
}

impl SecretRef {
    /// Parse the literal injected into pod env vars. Consumers resolve it outside the core's
    /// responsibility (a side-car or init-container); this parser only splits the string.
    ///
    /// Returns `None` on malformed input rather than a typed error: a malformed `vault-path`
    /// is a connector-specific annotation problem, and callers map that back onto
    /// `Error::EmptyAnnotationValue` with the annotation's name.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("vault:")?;
        let (before_key, key) = match rest.split_once('#') {
            Some((before, key)) => (before, Some(key.to_string())),
            None => (rest, None),
        };
        let (mount, subpath) = before_key.split_once("/data/")?;
        if mount.is_empty() || subpath.is_empty() {
            return None;
        }
        Some(SecretRef {
            mount: mount.to_string(),
            subpath: subpath.to_string(),
            key,
        })
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vault:{}/data/{}", self.mount, self.subpath)?;
        if let Some(key) = &self.key {
            write!(f, "#{key}")?;
        }
        Ok(())
    }
}

/// The opaque lower-level failure a `SecretStoreBackend` raises. The gateway wraps every
/// occurrence into `Error::InfrastructureServiceProblem("Vault", _)`.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// A KV v2 secret engine, abstracted behind the three primitives the core actually needs.
/// The concrete HTTP/SDK client (`vaultrs`, a hand-rolled `reqwest` client, ...) lives outside
/// the core, same as the PostgreSQL/RabbitMQ/Sentry/Keycloak protocol clients.
#[async_trait]
pub trait SecretStoreBackend: Send + Sync {
    /// Read the latest version of the secret at `mount`/`subpath`. A nonexistent path returns
    /// `Ok(None)`, never an error.
    async fn read_latest(
        &self,
        mount: &str,
        subpath: &str,
    ) -> std::result::Result<Option<BTreeMap<String, String>>, BackendError>;

    /// Create the secret at `mount`/`subpath` using compare-and-set=0, so a racing write against
    /// an already-present secret is rejected by the store rather than silently overwriting it.
    async fn create_cas0(
        &self,
        mount: &str,
        subpath: &str,
        data: &BTreeMap<String, String>,
    ) -> std::result::Result<(), BackendError>;

    /// Delete every version (and the metadata) of the secret at `mount`/`subpath`.
    async fn delete_all_versions(
        &self,
        mount: &str,
        subpath: &str,
    ) -> std::result::Result<(), BackendError>;
}

const SECURED_KEYS: [&str; 5] = ["pass", "token", "BROKER_PASSWORD", "DATABASE_PASSWORD", "SENTRY_DSN"];

fn mask(key: &str, value: &str) -> String {
    if SECURED_KEYS.iter().any(|secured| key.contains(secured)) {
        "******".to_string()
    } else {
        value.to_string()
    }
}

fn masked_for_log(data: &BTreeMap<String, String>) -> BTreeMap<&str, String> {
    data.iter()
        .map(|(k, v)| (k.as_str(), mask(k, v)))
        .collect()
}

/// Typed façade over a KV v2 secret engine. `mount` is the engine's mount point; every method
/// takes the path below it (the `<subpath>` half of a `SecretRef`).
pub struct SecretStoreGateway<B> {
    backend: B,
    mount: String,
}

impl<B: SecretStoreBackend> SecretStoreGateway<B> {
    pub fn new(backend: B, mount: impl Into<String>) -> Self {
        Self {
            backend,
            mount: mount.into(),
        }
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn build_ref(&self, subpath: &str, key: &str) -> String {
        SecretRef {
            mount: self.mount.clone(),
            subpath: subpath.to_string(),
            key: Some(key.to_string()),
        }
        .to_string()
    }

    pub async fn read_latest(&self, subpath: &str) -> Result<Option<BTreeMap<String, String>>> {
        debug!(msg = "reading secret", path = %subpath);
        let result = self
            .backend
            .read_latest(&self.mount, subpath)
            .await
            .map_err(|cause| Error::InfrastructureServiceProblem { system: "Vault", cause })?;
        if let Some(data) = &result {
            debug!(msg = "read secret", path = %subpath, data = ?masked_for_log(data));
        }
        Ok(result)
    }

    /// Create-if-absent via CAS=0. Any lower-level failure (including the store rejecting an
    /// accidental overwrite) is raised, never swallowed.
    pub async fn create(&self, subpath: &str, data: &BTreeMap<String, String>) -> Result<()> {
        info!(msg = "writing secret", path = %subpath, data = ?masked_for_log(data));
        self.backend
            .create_cas0(&self.mount, subpath, data)
            .await
            .map_err(|cause| Error::InfrastructureServiceProblem { system: "Vault", cause })
    }

    pub async fn delete_all_versions(&self, subpath: &str) -> Result<()> {
        info!(msg = "deleting secret", path = %subpath);
        self.backend
            .delete_all_versions(&self.mount, subpath)
            .await
            .map_err(|cause| Error::InfrastructureServiceProblem { system: "Vault", cause })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;
    use std::sync::Mutex;

    /// An in-memory KV v2 double with real CAS=0 semantics, for reconciler and dispatcher tests.
    #[derive(Default)]
    pub struct InMemoryBackend {
        store: Mutex<BTreeMap<(String, String), BTreeMap<String, String>>>,
    }

    impl InMemoryBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, mount: &str, subpath: &str, data: BTreeMap<String, String>) {
            self.store
                .lock()
                .unwrap()
                .insert((mount.to_string(), subpath.to_string()), data);
        }

        pub fn write_count(&self) -> usize {
            self.store.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SecretStoreBackend for InMemoryBackend {
        async fn read_latest(
            &self,
            mount: &str,
            subpath: &str,
        ) -> std::result::Result<Option<BTreeMap<String, String>>, BackendError> {
            Ok(self
                .store
                .lock()
                .unwrap()
                .get(&(mount.to_string(), subpath.to_string()))
                .cloned())
        }

        async fn create_cas0(
            &self,
            mount: &str,
            subpath: &str,
            data: &BTreeMap<String, String>,
        ) -> std::result::Result<(), BackendError> {
            let mut store = self.store.lock().unwrap();
            let key = (mount.to_string(), subpath.to_string());
            if store.contains_key(&key) {
                return Err("cas mismatch: secret already exists".into());
            }
            store.insert(key, data.clone());
            Ok(())
        }

        async fn delete_all_versions(
            &self,
            mount: &str,
            subpath: &str,
        ) -> std::result::Result<(), BackendError> {
            self.store
                .lock()
                .unwrap()
                .remove(&(mount.to_string(), subpath.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ref_with_key() {
        let r = SecretRef::parse("vault:secret/data/app/rabbit#BROKER_USER").unwrap();
        assert_eq!(r.mount, "secret");
        assert_eq!(r.subpath, "app/rabbit");
        assert_eq!(r.key.as_deref(), Some("BROKER_USER"));
    }

    #[test]
    fn parses_ref_without_key() {
        let r = SecretRef::parse("vault:secret/data/rabbit-creds").unwrap();
        assert_eq!(r.mount, "secret");
        assert_eq!(r.subpath, "rabbit-creds");
        assert_eq!(r.key, None);
    }

    #[test]
    fn rejects_malformed_ref() {
        assert!(SecretRef::parse("secret/data/foo").is_none());
        assert!(SecretRef::parse("vault:secret/foo").is_none());
    }

    #[test]
    fn display_round_trips() {
        let raw = "vault:secret/data/app/rabbit#BROKER_USER";
        let r = SecretRef::parse(raw).unwrap();
        assert_eq!(r.to_string(), raw);
    }

    #[test]
    fn masks_secured_keys_by_substring() {
        let mut data = BTreeMap::new();
        data.insert("DATABASE_PASSWORD".to_string(), "hunter2".to_string());
        data.insert("DATABASE_HOST".to_string(), "db.internal".to_string());
        let masked = masked_for_log(&data);
        assert_eq!(masked["DATABASE_PASSWORD"], "******");
        assert_eq!(masked["DATABASE_HOST"], "db.internal");
    }

    #[tokio::test]
    async fn cas0_rejects_second_write() {
        let backend = test_util::InMemoryBackend::new();
        let gw = SecretStoreGateway::new(backend, "secret");
        let mut data = BTreeMap::new();
        data.insert("a".to_string(), "b".to_string());
        gw.create("app/rabbit", &data).await.unwrap();
        let err = gw.create("app/rabbit", &data).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn read_nonexistent_path_is_none_not_error() {
        let backend = test_util::InMemoryBackend::new();
        let gw = SecretStoreGateway::new(backend, "secret");
        assert!(gw.read_latest("app/missing").await.unwrap().is_none());
    }
}
