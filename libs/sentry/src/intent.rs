use tenantbind_core::error::Result;
use tenantbind_core::intent::{optional_annotation_or, parse_vault_path_annotation, require_annotation, require_label};
use tenantbind_k8s_util::workload::WorkloadMeta;

pub const INSTANCE_NAME: &str = "sentry.connector.itlabs.io/instance-name";
pub const VAULT_PATH: &str = "sentry.connector.itlabs.io/vault-path";
pub const PROJECT: &str = "sentry.connector.itlabs.io/project";
pub const TEAM: &str = "sentry.connector.itlabs.io/team";
pub const ENVIRONMENT: &str = "sentry.connector.itlabs.io/environment";
pub const APP_LABEL: &str = "app";

pub const REQUIRED_ANNOTATIONS: &[&str] = &[INSTANCE_NAME, VAULT_PATH];
pub const REQUIRED_LABELS: &[&str] = &[APP_LABEL];

const DEFAULT_ENVIRONMENT: &str = "production";

/// Short names Sentry environment tags are rewritten to, so dashboards don't carry the full
/// Kubernetes environment label verbatim.
const ENVIRONMENT_SHORT_NAMES: &[(&str, &str)] = &[
    ("production", "prod"),
    ("staging", "stg"),
    ("development", "dev"),
    ("testing", "test"),
];

pub fn shorten_environment(environment: &str) -> String {
    ENVIRONMENT_SHORT_NAMES
        .iter()
        .find(|(full, _)| *full == environment)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| environment.to_string())
}

/// A workload's request to provision a Sentry team/project/DSN.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentryIntent {
    pub instance_name: String,
    pub tenant_path: String,
    pub team: String,
    pub project: String,
    pub environment: String,
}

pub fn is_used_by(meta: &WorkloadMeta) -> bool {
    tenantbind_core::intent::has_all(meta, REQUIRED_ANNOTATIONS, REQUIRED_LABELS)
}

pub fn parse_intent(meta: &WorkloadMeta) -> Result<SentryIntent> {
    require_label(meta, APP_LABEL)?;
    let environment = meta.annotation(ENVIRONMENT).unwrap_or(DEFAULT_ENVIRONMENT);
    Ok(SentryIntent {
        instance_name: require_annotation(meta, INSTANCE_NAME)?.to_string(),
        tenant_path: parse_vault_path_annotation(meta, VAULT_PATH)?.subpath,
        team: optional_annotation_or(meta, TEAM, APP_LABEL)?.to_string(),
        project: optional_annotation_or(meta, PROJECT, APP_LABEL)?.to_string(),
        environment: shorten_environment(environment),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn full_meta() -> WorkloadMeta {
        let annotations: BTreeMap<String, String> = [
            (INSTANCE_NAME, "primary"),
            (VAULT_PATH, "vault:secret/data/app/billing-sentry"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let labels = BTreeMap::from([(APP_LABEL.to_string(), "billing".to_string())]);
        WorkloadMeta::new(annotations, labels)
    }

    #[test]
    fn project_and_team_default_to_app_label() {
        let intent = parse_intent(&full_meta()).unwrap();
        assert_eq!(intent.team, "billing");
        assert_eq!(intent.project, "billing");
    }

    #[test]
    fn environment_defaults_to_production_and_is_shortened() {
        let intent = parse_intent(&full_meta()).unwrap();
        assert_eq!(intent.environment, "prod");
    }

    #[test]
    fn explicit_environment_is_shortened() {
        let mut meta = full_meta();
        meta.annotations
            .insert(ENVIRONMENT.to_string(), "staging".to_string());
        let intent = parse_intent(&meta).unwrap();
        assert_eq!(intent.environment, "stg");
    }

    #[test]
    fn missing_app_label_fails() {
        let meta = WorkloadMeta::new(
            BTreeMap::from([
                (INSTANCE_NAME.to_string(), "primary".to_string()),
                (VAULT_PATH.to_string(), "vault:secret/data/app/billing-sentry".to_string()),
            ]),
            BTreeMap::new(),
        );
        assert!(parse_intent(&meta).is_err());
        assert!(!is_used_by(&meta));
    }
}
