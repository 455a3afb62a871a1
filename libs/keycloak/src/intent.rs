use tenantbind_core::error::Result;
use tenantbind_core::intent::{parse_vault_path_annotation, require_annotation};
use tenantbind_k8s_util::workload::WorkloadMeta;

pub const INSTANCE_NAME: &str = "keycloak.connector.itlabs.io/instance-name";
pub const VAULT_PATH: &str = "keycloak.connector.itlabs.io/vault-path";
pub const CLIENT_ID: &str = "keycloak.connector.itlabs.io/client-id";

pub const REQUIRED_ANNOTATIONS: &[&str] = &[INSTANCE_NAME, VAULT_PATH, CLIENT_ID];

/// A workload's request to register (or reuse) an OIDC client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeycloakIntent {
    pub instance_name: String,
    pub tenant_path: String,
    pub client_id: String,
}

pub fn is_used_by(meta: &WorkloadMeta) -> bool {
    tenantbind_core::intent::has_all(meta, REQUIRED_ANNOTATIONS, &[])
}

pub fn parse_intent(meta: &WorkloadMeta) -> Result<KeycloakIntent> {
    Ok(KeycloakIntent {
        instance_name: require_annotation(meta, INSTANCE_NAME)?.to_string(),
        tenant_path: parse_vault_path_annotation(meta, VAULT_PATH)?.subpath,
        client_id: require_annotation(meta, CLIENT_ID)?.to_string(),
    })
}
