use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One Postgres instance's connection coordinates and admin-credential path. `secret_store_path`
/// points at a Secret-Store entry holding `ADMIN_USER`/`ADMIN_PASSWORD`; host/port/database
/// aren't secret and live on the descriptor directly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostgresConnectorEntry {
    pub name: String,
    pub secret_store_path: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Role granted read-only access to the tenant's tables, if this instance offers one.
    pub readonly_role: Option<String>,
}

/// Registers the instances microservices can bind to by name: a list of entries rather than a
/// single object, since one Postgres connector resource can front several instances.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "connector.itlabs.io",
    version = "v1",
    kind = "PostgresConnector",
    plural = "postgresconnectors",
    singular = "postgresconnector",
    shortname = "pgconn",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PostgresConnectorSpec {
    pub entries: Vec<PostgresConnectorEntry>,
}
