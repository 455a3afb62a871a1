pub mod adapter;
pub mod crd;
pub mod intent;
pub mod pipeline;
pub mod reconcile;
pub mod registry;

pub use crd::{RabbitConnector, RabbitConnectorEntry, RabbitConnectorSpec};
pub use intent::RabbitIntent;
pub use pipeline::RabbitPipeline;
pub use reconcile::{RabbitAdminCredential, RabbitReconciler, RabbitTenantCredential};
pub use registry::CrdRegistry;

#[cfg(test)]
mod tests {
    use crate::adapter::test_util::InMemoryRabbit;
    use crate::crd::RabbitConnectorEntry;
    use crate::intent::RabbitIntent;
    use crate::reconcile::RabbitReconciler;

    use std::collections::BTreeMap;

    use tenantbind_core::error::Error;
    use tenantbind_core::password::test_util::FixedPasswordGenerator;
    use tenantbind_core::reconcile::reconcile;
    use tenantbind_core::registry::test_util::StaticRegistry;
    use tenantbind_core::secret_store::test_util::InMemoryBackend;
    use tenantbind_core::secret_store::SecretStoreGateway;

    fn descriptor() -> RabbitConnectorEntry {
        RabbitConnectorEntry {
            name: "primary".to_string(),
            secret_store_path: "vault:secret/data/infra/rabbit-primary".to_string(),
            host: "mq.internal".to_string(),
            port: 5672,
        }
    }

    fn intent() -> RabbitIntent {
        RabbitIntent {
            instance_name: "primary".to_string(),
            tenant_path: "app/billing".to_string(),
            username: "billing_app".to_string(),
            vhost: "billing".to_string(),
        }
    }

    fn seeded_gateway() -> SecretStoreGateway<InMemoryBackend> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/rabbit-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        SecretStoreGateway::new(backend, "secret")
    }

    // initial deploy provisions user, vhost, and permissions, and writes the tenant secret.
    #[tokio::test]
    async fn initial_deploy_provisions_everything() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemoryRabbit::new();
        let reconciler = RabbitReconciler::new(registry, adapter, FixedPasswordGenerator("generated".to_string()));

        let outcome = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(outcome.wrote);
        assert_eq!(outcome.tenant_cred.password, "generated");
    }

    // redeploying against an already-provisioned tenant is a no-op; no password alteration.
    #[tokio::test]
    async fn redeploy_is_a_noop() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemoryRabbit::new();
        let reconciler = RabbitReconciler::new(registry, adapter, FixedPasswordGenerator("generated".to_string()));

        reconcile(&reconciler, &gateway, intent()).await.unwrap();
        let second = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(!second.wrote);
        assert_eq!(second.tenant_cred.password, "generated");
    }

    // a stored tenant credential naming a different user than the current intent conflicts.
    #[tokio::test]
    async fn mismatched_stored_user_is_a_conflict() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemoryRabbit::new();
        let reconciler = RabbitReconciler::new(registry, adapter, FixedPasswordGenerator("generated".to_string()));
        reconcile(&reconciler, &gateway, intent()).await.unwrap();

        let mut other = intent();
        other.username = "someone_else".to_string();
        let err = reconcile(&reconciler, &gateway, other).await.unwrap_err();
        assert!(matches!(err, Error::TenantCredentialConflict { .. }));
    }

    #[tokio::test]
    async fn preexisting_rabbit_user_is_not_recreated_or_altered() {
        let gateway = seeded_gateway();
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor())],
        };
        let adapter = InMemoryRabbit::new();
        adapter.seed_user("billing_app");
        let reconciler = RabbitReconciler::new(registry, adapter, FixedPasswordGenerator("generated".to_string()));

        reconcile(&reconciler, &gateway, intent()).await.unwrap();
    }
}
