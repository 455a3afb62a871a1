use tenantbind_core::error::Result;
use tenantbind_core::intent::{parse_vault_path_annotation, require_annotation};
use tenantbind_k8s_util::workload::WorkloadMeta;

pub const INSTANCE_NAME: &str = "rabbit.connector.itlabs.io/instance-name";
pub const VAULT_PATH: &str = "rabbit.connector.itlabs.io/vault-path";
pub const USERNAME: &str = "rabbit.connector.itlabs.io/username";
pub const VHOST: &str = "rabbit.connector.itlabs.io/vhost";

pub const REQUIRED_ANNOTATIONS: &[&str] = &[INSTANCE_NAME, VAULT_PATH, USERNAME, VHOST];

/// A workload's request to be bound to a named RabbitMQ instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RabbitIntent {
    pub instance_name: String,
    pub tenant_path: String,
    pub username: String,
    pub vhost: String,
}

pub fn is_used_by(meta: &WorkloadMeta) -> bool {
    tenantbind_core::intent::has_all(meta, REQUIRED_ANNOTATIONS, &[])
}

pub fn parse_intent(meta: &WorkloadMeta) -> Result<RabbitIntent> {
    Ok(RabbitIntent {
        instance_name: require_annotation(meta, INSTANCE_NAME)?.to_string(),
        tenant_path: parse_vault_path_annotation(meta, VAULT_PATH)?.subpath,
        username: require_annotation(meta, USERNAME)?.to_string(),
        vhost: require_annotation(meta, VHOST)?.to_string(),
    })
}
