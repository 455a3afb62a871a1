//! A thin `reqwest`-based [`SecretStoreBackend`] against a real Vault KV v2 mount.
//!
//! Deliberately outside the reconciliation-and-mutation core, same as the PostgreSQL/RabbitMQ/
//! Sentry/Keycloak protocol clients: it exists so the repo is runnable end-to-end rather than
//! only exposing the backend trait.

use crate::secret_store::{BackendError, SecretStoreBackend};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Talks to a Vault server's KV v2 HTTP API using a fixed token.
pub struct VaultHttpBackend {
    client: reqwest::Client,
    addr: String,
    token: String,
}

impl VaultHttpBackend {
    pub fn new(addr: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            addr: addr.into(),
            token: token.into(),
        }
    }

    fn data_url(&self, mount: &str, subpath: &str) -> String {
        format!("{}/v1/{mount}/data/{subpath}", self.addr.trim_end_matches('/'))
    }

    fn metadata_url(&self, mount: &str, subpath: &str) -> String {
        format!("{}/v1/{mount}/metadata/{subpath}", self.addr.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct ReadResponse {
    data: ReadResponseData,
}

#[derive(Deserialize)]
struct ReadResponseData {
    data: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    data: &'a BTreeMap<String, String>,
    options: WriteOptions,
}

#[derive(Serialize)]
struct WriteOptions {
    cas: u64,
}

#[async_trait]
impl SecretStoreBackend for VaultHttpBackend {
    async fn read_latest(
        &self,
        mount: &str,
        subpath: &str,
    ) -> Result<Option<BTreeMap<String, String>>, BackendError> {
        let response = self
            .client
            .get(self.data_url(mount, subpath))
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let parsed: ReadResponse = response.json().await?;
        Ok(Some(parsed.data.data))
    }

    async fn create_cas0(
        &self,
        mount: &str,
        subpath: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), BackendError> {
        let body = WriteRequest { data, options: WriteOptions { cas: 0 } };
        self.client
            .post(self.data_url(mount, subpath))
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_all_versions(&self, mount: &str, subpath: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.metadata_url(mount, subpath))
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status()?;
        Ok(())
    }
}
