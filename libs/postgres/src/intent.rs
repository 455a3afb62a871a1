use tenantbind_core::error::Result;
use tenantbind_core::intent::{parse_vault_path_annotation, require_annotation};
use tenantbind_k8s_util::workload::WorkloadMeta;

pub const INSTANCE_NAME: &str = "postgres.connector.itlabs.io/instance-name";
pub const VAULT_PATH: &str = "postgres.connector.itlabs.io/vault-path";
pub const DB_NAME: &str = "postgres.connector.itlabs.io/db-name";
pub const DB_USERNAME: &str = "postgres.connector.itlabs.io/db-username";

pub const REQUIRED_ANNOTATIONS: &[&str] = &[INSTANCE_NAME, VAULT_PATH, DB_NAME, DB_USERNAME];

/// A workload's request to be bound to a named Postgres instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostgresIntent {
    pub instance_name: String,
    pub tenant_path: String,
    pub db_name: String,
    pub db_username: String,
}

/// Returns `true` iff the workload opted into this connector (all required annotations present).
pub fn is_used_by(meta: &WorkloadMeta) -> bool {
    tenantbind_core::intent::has_all(meta, REQUIRED_ANNOTATIONS, &[])
}

pub fn parse_intent(meta: &WorkloadMeta) -> Result<PostgresIntent> {
    Ok(PostgresIntent {
        instance_name: require_annotation(meta, INSTANCE_NAME)?.to_string(),
        tenant_path: parse_vault_path_annotation(meta, VAULT_PATH)?.subpath,
        db_name: require_annotation(meta, DB_NAME)?.to_string(),
        db_username: require_annotation(meta, DB_USERNAME)?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn full_meta() -> WorkloadMeta {
        let annotations: BTreeMap<String, String> = [
            (INSTANCE_NAME, "primary"),
            (VAULT_PATH, "vault:secret/data/app/billing-db"),
            (DB_NAME, "billing"),
            (DB_USERNAME, "billing_app"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        WorkloadMeta::new(annotations, BTreeMap::new())
    }

    #[test]
    fn opts_in_when_all_annotations_present() {
        assert!(is_used_by(&full_meta()));
    }

    #[test]
    fn does_not_opt_in_when_one_annotation_missing() {
        let mut meta = full_meta();
        meta.annotations.remove(DB_NAME);
        assert!(!is_used_by(&meta));
    }

    #[test]
    fn parses_full_intent() {
        let intent = parse_intent(&full_meta()).unwrap();
        assert_eq!(intent.instance_name, "primary");
        assert_eq!(intent.db_name, "billing");
        assert_eq!(intent.db_username, "billing_app");
    }
}
