pub mod adapter;
pub mod crd;
pub mod intent;
pub mod pipeline;
pub mod reconcile;
pub mod registry;

pub use crd::{SentryConnector, SentryConnectorSpec};
pub use intent::SentryIntent;
pub use pipeline::SentryPipeline;
pub use reconcile::{SentryAdminCredential, SentryInstance, SentryReconciler, SentryTenantCredential};
pub use registry::CrdRegistry;

#[cfg(test)]
mod tests {
    use crate::adapter::test_util::InMemorySentry;
    use crate::intent::SentryIntent;
    use crate::reconcile::{SentryInstance, SentryReconciler};

    use std::collections::BTreeMap;

    use tenantbind_core::reconcile::reconcile;
    use tenantbind_core::registry::test_util::StaticRegistry;
    use tenantbind_core::secret_store::test_util::InMemoryBackend;
    use tenantbind_core::secret_store::SecretStoreGateway;

    fn descriptor() -> SentryInstance {
        SentryInstance {
            secret_store_path: "vault:secret/data/infra/sentry-primary".to_string(),
            url: "https://sentry.example.com".to_string(),
            organization: "acme".to_string(),
        }
    }

    fn intent() -> SentryIntent {
        SentryIntent {
            instance_name: "primary".to_string(),
            tenant_path: "app/billing".to_string(),
            team: "billing".to_string(),
            project: "billing".to_string(),
            environment: "prod".to_string(),
        }
    }

    fn seeded_gateway() -> SecretStoreGateway<InMemoryBackend> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/sentry-primary",
            BTreeMap::from([("API_TOKEN".to_string(), "tok".to_string())]),
        );
        SecretStoreGateway::new(backend, "secret")
    }

    // initial deploy creates team/project/key and writes the DSN.
    #[tokio::test]
    async fn initial_deploy_creates_team_project_and_key() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemorySentry::new();
        let reconciler = SentryReconciler::new(registry, adapter);

        let outcome = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(outcome.wrote);
        assert!(outcome.tenant_cred.dsn().unwrap().contains("billing-prod"));
    }

    // a revoked DSN triggers delete-then-reprovision rather than a silent overwrite attempt.
    #[tokio::test]
    async fn revoked_dsn_is_reprovisioned() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemorySentry::new();
        reconcile(
            &SentryReconciler::new(
                StaticRegistry {
                    crd_installed: true,
                    entries: vec![("primary".to_string(), descriptor())],
                },
                InMemorySentry::new(),
            ),
            &gateway,
            intent(),
        )
        .await
        .unwrap();

        let first_dsn = gateway
            .read_latest("app/billing")
            .await
            .unwrap()
            .unwrap()
            .get("SENTRY_DSN")
            .cloned()
            .unwrap();

        let revoking_adapter = InMemorySentry::new();
        revoking_adapter.revoke(&first_dsn);
        let reconciler = SentryReconciler::new(registry, revoking_adapter);
        let outcome = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(outcome.wrote, "a revoked DSN must trigger re-provisioning, not a no-op");
        assert_ne!(outcome.tenant_cred.dsn().unwrap(), first_dsn);
    }
}
