use crate::error::Result;
use crate::metrics::SharedMetrics;

use k8s_openapi::api::core::v1::PodSpec;
use tenantbind_k8s_util::env::{mutate_pod_spec, EnvBinding};
use tenantbind_k8s_util::workload::WorkloadMeta;

use async_trait::async_trait;

/// Object-safe view of one connector's end-to-end pipeline, used by the [`Dispatcher`] to treat
/// Postgres/Rabbit/Sentry/Keycloak uniformly despite their different `ConnectorReconciler`
/// associated types.
#[async_trait]
pub trait ConnectorPipeline: Send + Sync {
    fn connector_name(&self) -> &'static str;

    /// Parse the intent (if the workload opts in) and drive it through the reconciler. Returns
    /// the env-var bindings this connector wants present on the pod, or an empty list if the
    /// workload did not opt into this connector — a workload missing any required annotation
    /// contributes no side effects for that connector.
    async fn run(&self, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>>;
}

/// Enumerates the connectors active on a workload, runs their reconcilers, and — on admission —
/// applies the mutation pipeline afterwards, so injected env vars always reference paths that
/// already exist.
///
/// Connector iteration order is fixed (Postgres, Rabbit, Sentry, Keycloak) so that runs are
/// deterministic; the order itself isn't otherwise significant.
pub struct Dispatcher {
    pipelines: Vec<Box<dyn ConnectorPipeline>>,
    metrics: Option<SharedMetrics>,
}

impl Dispatcher {
    pub fn new(pipelines: Vec<Box<dyn ConnectorPipeline>>) -> Self {
        Self { pipelines, metrics: None }
    }

    pub fn with_metrics(pipelines: Vec<Box<dyn ConnectorPipeline>>, metrics: SharedMetrics) -> Self {
        Self { pipelines, metrics: Some(metrics) }
    }

    async fn run_pipeline(&self, pipeline: &dyn ConnectorPipeline, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>> {
        let connector = pipeline.connector_name();
        let result = pipeline.run(meta).await;
        if let Some(metrics) = &self.metrics {
            metrics.reconcile_inc(connector);
            if result.is_err() {
                metrics.reconcile_failure_inc(connector);
            }
        }
        result
    }

    /// Deployment-change entry point: run every active connector's reconciler, no mutation.
    pub async fn reconcile(&self, meta: &WorkloadMeta) -> Result<()> {
        for pipeline in &self.pipelines {
            self.run_pipeline(pipeline.as_ref(), meta).await?;
        }
        Ok(())
    }

    /// Admission entry point: reconcile every active connector, then mutate the pod template.
    /// A reconciler failure aborts the admission; any reconciliation that already ran before the
    /// failure is not rolled back.
    pub async fn admit(&self, meta: &WorkloadMeta, pod_spec: &mut PodSpec) -> Result<bool> {
        let mut bindings = Vec::new();
        for pipeline in &self.pipelines {
            bindings.extend(self.run_pipeline(pipeline.as_ref(), meta).await?);
        }
        let mutated = mutate_pod_spec(pod_spec, &bindings);
        if mutated {
            if let Some(metrics) = &self.metrics {
                metrics.mutation_inc("pod");
            }
        }
        Ok(mutated)
    }
}
