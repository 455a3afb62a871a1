use crate::adapter::KeycloakAdapter;
use crate::intent::{is_used_by, parse_intent};
use crate::reconcile::{KeycloakInstance, KeycloakReconciler};

use async_trait::async_trait;
use tenantbind_core::dispatcher::ConnectorPipeline;
use tenantbind_core::error::Result;
use tenantbind_core::reconcile::reconcile;
use tenantbind_core::registry::InstanceRegistry;
use tenantbind_core::secret_store::{SecretStoreBackend, SecretStoreGateway};
use tenantbind_k8s_util::env::EnvBinding;
use tenantbind_k8s_util::workload::WorkloadMeta;

pub struct KeycloakPipeline<R, A, B> {
    reconciler: KeycloakReconciler<R, A>,
    gateway: SecretStoreGateway<B>,
}

impl<R, A, B> KeycloakPipeline<R, A, B> {
    pub fn new(reconciler: KeycloakReconciler<R, A>, gateway: SecretStoreGateway<B>) -> Self {
        Self { reconciler, gateway }
    }
}

#[async_trait]
impl<R, A, B> ConnectorPipeline for KeycloakPipeline<R, A, B>
where
    R: InstanceRegistry<KeycloakInstance> + Send + Sync,
    A: KeycloakAdapter,
    B: SecretStoreBackend,
{
    fn connector_name(&self) -> &'static str {
        "keycloak"
    }

    async fn run(&self, meta: &WorkloadMeta) -> Result<Vec<EnvBinding>> {
        if !is_used_by(meta) {
            return Ok(Vec::new());
        }
        let intent = parse_intent(meta)?;
        let tenant_path = intent.tenant_path.clone();
        reconcile(&self.reconciler, &self.gateway, intent).await?;

        Ok(vec![
            EnvBinding::new(
                "KEYCLOAK_CLIENT_ID",
                self.gateway.build_ref(&tenant_path, "KEYCLOAK_CLIENT_ID"),
            ),
            EnvBinding::new(
                "KEYCLOAK_SECRET",
                self.gateway.build_ref(&tenant_path, "KEYCLOAK_SECRET"),
            ),
        ])
    }
}
