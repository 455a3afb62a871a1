use crate::adapter::PostgresAdapter;
use crate::crd::PostgresConnectorEntry;
use crate::intent::{is_used_by, parse_intent};
use crate::reconcile::PostgresReconciler;

use async_trait::async_trait;
use tenantbind_core::dispatcher::ConnectorPipeline;
use tenantbind_core::error::Result;
use tenantbind_core::password::PasswordGenerator;
use tenantbind_core::reconcile::reconcile;
use tenantbind_core::registry::InstanceRegistry;
use tenantbind_core::secret_store::{SecretStoreBackend, SecretStoreGateway};
use tenantbind_k8s_util::env::EnvBinding;
use tenantbind_k8s_util::workload::WorkloadMeta;

/// Wires [`PostgresReconciler`] into the [`ConnectorPipeline`] the `Dispatcher` drives.
pub struct PostgresPipeline<R, A, P, B> {
    reconciler: PostgresReconciler<R, A, P>,
    gateway: SecretStoreGateway<B>,
}

impl<R, A, P, B> PostgresPipeline<R, A, P, B> {
    pub fn new(reconciler: PostgresReconciler<R, A, P>, gateway: SecretStoreGateway<B>) -> Self {
        Self { reconciler, gateway }
    }
}

#[async_trait]
impl<R, A, P, B> ConnectorPipeline for PostgresPipeline<R, A, P, B>
where
    R: InstanceRegistry<PostgresConnectorEntry> + Send + Sync,
    A: PostgresAdapter,
    P: PasswordGenerator,
    B: SecretStoreBackend,
{
    fn connector_name(&self) -> &'static str {
        "postgres"
    }

    async fn run(&self, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>> {
        if !is_used_by(meta) {
            return Ok(Vec::new());
        }
        let intent = parse_intent(meta)?;
        let tenant_path = intent.tenant_path.clone();
        reconcile(&self.reconciler, &self.gateway, intent).await?;

        Ok(vec![
            EnvBinding::new("DATABASE_HOST", self.gateway.build_ref(&tenant_path, "DATABASE_HOST")),
            EnvBinding::new("DATABASE_PORT", self.gateway.build_ref(&tenant_path, "DATABASE_PORT")),
            EnvBinding::new("DATABASE_NAME", self.gateway.build_ref(&tenant_path, "DATABASE_NAME")),
            EnvBinding::new("DATABASE_USER", self.gateway.build_ref(&tenant_path, "DATABASE_USER")),
            EnvBinding::new(
                "DATABASE_PASSWORD",
                self.gateway.build_ref(&tenant_path, "DATABASE_PASSWORD"),
            ),
        ])
    }
}
