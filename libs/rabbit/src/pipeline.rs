use crate::adapter::RabbitAdapter;
use crate::crd::RabbitConnectorEntry;
use crate::intent::{is_used_by, parse_intent};
use crate::reconcile::RabbitReconciler;

use async_trait::async_trait;
use tenantbind_core::dispatcher::ConnectorPipeline;
use tenantbind_core::error::Result;
use tenantbind_core::password::PasswordGenerator;
use tenantbind_core::reconcile::reconcile;
use tenantbind_core::registry::InstanceRegistry;
use tenantbind_core::secret_store::{SecretStoreBackend, SecretStoreGateway};
use tenantbind_k8s_util::env::EnvBinding;
use tenantbind_k8s_util::workload::WorkloadMeta;

pub struct RabbitPipeline<R, A, P, B> {
    reconciler: RabbitReconciler<R, A, P>,
    gateway: SecretStoreGateway<B>,
}

impl<R, A, P, B> RabbitPipeline<R, A, P, B> {
    pub fn new(reconciler: RabbitReconciler<R, A, P>, gateway: SecretStoreGateway<B>) -> Self {
        Self { reconciler, gateway }
    }
}

#[async_trait]
impl<R, A, P, B> ConnectorPipeline for RabbitPipeline<R, A, P, B>
where
    R: InstanceRegistry<RabbitConnectorEntry> + Send + Sync,
    A: RabbitAdapter,
    P: PasswordGenerator,
    B: SecretStoreBackend,
{
    fn connector_name(&self) -> &'static str {
        "rabbit"
    }

    async fn run(&self, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>> {
        if !is_used_by(meta) {
            return Ok(Vec::new());
        }
        let intent = parse_intent(meta)?;
        let tenant_path = intent.tenant_path.clone();
        reconcile(&self.reconciler, &self.gateway, intent).await?;

        Ok(vec![
            EnvBinding::new("BROKER_HOST", self.gateway.build_ref(&tenant_path, "BROKER_HOST")),
            EnvBinding::new("BROKER_PORT", self.gateway.build_ref(&tenant_path, "BROKER_PORT")),
            EnvBinding::new("BROKER_USER", self.gateway.build_ref(&tenant_path, "BROKER_USER")),
            EnvBinding::new(
                "BROKER_PASSWORD",
                self.gateway.build_ref(&tenant_path, "BROKER_PASSWORD"),
            ),
            EnvBinding::new("BROKER_VHOST", self.gateway.build_ref(&tenant_path, "BROKER_VHOST")),
            EnvBinding::new("BROKER_URL", self.gateway.build_ref(&tenant_path, "BROKER_URL")),
        ])
    }
}
