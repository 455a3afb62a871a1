use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The single Sentry organization microservices provision teams/projects/DSNs under.
/// `secret_store_path` points at a Secret-Store entry holding `API_TOKEN`.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "connector.itlabs.io",
    version = "v1",
    kind = "SentryConnector",
    plural = "sentryconnectors",
    singular = "sentryconnector",
    shortname = "sentryconn",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SentryConnectorSpec {
    pub secret_store_path: String,
    pub url: String,
    pub organization: String,
}
