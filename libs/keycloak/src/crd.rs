use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The single Keycloak realm microservices register OIDC clients against. `secret_store_path`
/// points at a Secret-Store entry holding `ADMIN_USER`/`ADMIN_PASSWORD`.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "connector.itlabs.io",
    version = "v1",
    kind = "KeycloakConnector",
    plural = "keycloakconnectors",
    singular = "keycloakconnector",
    shortname = "kcconn",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakConnectorSpec {
    pub secret_store_path: String,
    pub url: String,
    pub realm: String,
}
