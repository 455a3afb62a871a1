pub mod adapter;
pub mod crd;
pub mod intent;
pub mod pipeline;
pub mod reconcile;
pub mod registry;

pub use crd::{PostgresConnector, PostgresConnectorEntry, PostgresConnectorSpec};
pub use intent::PostgresIntent;
pub use pipeline::PostgresPipeline;
pub use reconcile::{PostgresAdminCredential, PostgresReconciler, PostgresTenantCredential};
pub use registry::CrdRegistry;

#[cfg(test)]
mod tests {
    use crate::adapter::test_util::InMemoryPostgres;
    use crate::crd::PostgresConnectorEntry;
    use crate::intent::PostgresIntent;
    use crate::reconcile::PostgresReconciler;

    use std::collections::BTreeMap;

    use tenantbind_core::password::test_util::FixedPasswordGenerator;
    use tenantbind_core::reconcile::reconcile;
    use tenantbind_core::registry::test_util::StaticRegistry;
    use tenantbind_core::secret_store::test_util::InMemoryBackend;
    use tenantbind_core::secret_store::SecretStoreGateway;

    fn descriptor(readonly_role: Option<&str>) -> PostgresConnectorEntry {
        PostgresConnectorEntry {
            name: "primary".to_string(),
            secret_store_path: "vault:secret/data/infra/postgres-primary".to_string(),
            host: "db.internal".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            readonly_role: readonly_role.map(str::to_string),
        }
    }

    fn intent() -> PostgresIntent {
        PostgresIntent {
            instance_name: "primary".to_string(),
            tenant_path: "app/billing".to_string(),
            db_name: "billing".to_string(),
            db_username: "billing_app".to_string(),
        }
    }

    #[tokio::test]
    async fn provisions_new_database_and_user() {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/postgres-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        let gateway = SecretStoreGateway::new(backend, "secret");

        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor(None))],
        };
        let adapter = InMemoryPostgres::new();
        let reconciler = PostgresReconciler::new(
            registry,
            adapter,
            FixedPasswordGenerator("generated-pw".to_string()),
        );

        let outcome = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(outcome.wrote);
        assert_eq!(outcome.tenant_cred.password, "generated-pw");

        let second = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert!(!second.wrote, "second reconcile must be a no-op, not an overwrite");
    }

    #[tokio::test]
    async fn alters_password_for_preexisting_user_without_recreating() {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/postgres-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        let gateway = SecretStoreGateway::new(backend, "secret");
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("primary".to_string(), descriptor(Some("readonly")))],
        };
        let adapter = InMemoryPostgres::new();
        adapter.seed_user("billing_app", "old-pw");
        adapter.seed_database("billing");

        let reconciler = PostgresReconciler::new(registry, adapter, FixedPasswordGenerator("new-pw".to_string()));
        let outcome = reconcile(&reconciler, &gateway, intent()).await.unwrap();
        assert_eq!(
            outcome.tenant_cred.password, "new-pw",
            "existing user's password must be rotated to the freshly built credential"
        );
    }
}
