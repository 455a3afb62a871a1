use crate::adapter::SentryAdapter;
use crate::intent::{is_used_by, parse_intent};
use crate::reconcile::{SentryInstance, SentryReconciler};

use async_trait::async_trait;
use tenantbind_core::dispatcher::ConnectorPipeline;
use tenantbind_core::error::Result;
use tenantbind_core::reconcile::reconcile;
use tenantbind_core::registry::InstanceRegistry;
use tenantbind_core::secret_store::{SecretStoreBackend, SecretStoreGateway};
use tenantbind_k8s_util::env::EnvBinding;
use tenantbind_k8s_util::workload::WorkloadMeta;

pub struct SentryPipeline<R, A, B> {
    reconciler: SentryReconciler<R, A>,
    gateway: SecretStoreGateway<B>,
}

impl<R, A, B> SentryPipeline<R, A, B> {
    pub fn new(reconciler: SentryReconciler<R, A>, gateway: SecretStoreGateway<B>) -> Self {
        Self { reconciler, gateway }
    }
}

#[async_trait]
impl<R, A, B> ConnectorPipeline for SentryPipeline<R, A, B>
where
    R: InstanceRegistry<SentryInstance> + Send + Sync,
    A: SentryAdapter,
    B: SecretStoreBackend,
{
    fn connector_name(&self) -> &'static str {
        "sentry"
    }

    async fn run(&self, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>> {
        if !is_used_by(meta) {
            return Ok(Vec::new());
        }
        let intent = parse_intent(meta)?;
        let tenant_path = intent.tenant_path.clone();
        reconcile(&self.reconciler, &self.gateway, intent).await?;

        // Only SENTRY_DSN is injected as an env var; SENTRY_PROJECT_SLUG/SENTRY_TEAM stay in the
        // secret store for bookkeeping only.
        Ok(vec![EnvBinding::new(
            "SENTRY_DSN",
            self.gateway.build_ref(&tenant_path, "SENTRY_DSN"),
        )])
    }
}
