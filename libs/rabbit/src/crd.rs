use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One RabbitMQ instance's management-API coordinates. `secret_store_path` points at a
/// Secret-Store entry holding `ADMIN_USER`/`ADMIN_PASSWORD` for that API.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RabbitConnectorEntry {
    pub name: String,
    pub secret_store_path: String,
    pub host: String,
    pub port: u16,
}

/// Registers the RabbitMQ instances microservices can bind to by name (list-shaped).
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "connector.itlabs.io",
    version = "v1",
    kind = "RabbitConnector",
    plural = "rabbitconnectors",
    singular = "rabbitconnector",
    shortname = "rabbitconn",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RabbitConnectorSpec {
    pub entries: Vec<RabbitConnectorEntry>,
}
