use crate::crd::SentryConnector;
use crate::reconcile::SentryInstance;

use tenantbind_core::error::Result;
use tenantbind_core::registry::InstanceRegistry;

use kube::runtime::reflector::Store;
use kube::ResourceExt;

/// Backs [`InstanceRegistry`] with a live reflector store of `SentryConnector` custom resources.
/// Each CR's own name is the instance name, since a Sentry connector instance is a single object
/// rather than a list.
pub struct CrdRegistry {
    store: Store<SentryConnector>,
}

impl CrdRegistry {
    pub fn new(store: Store<SentryConnector>) -> Self {
        Self { store }
    }
}

impl InstanceRegistry<SentryInstance> for CrdRegistry {
    fn resolve(&self, instance_name: &str) -> Result<Option<SentryInstance>> {
        Ok(self.store.state().iter().find(|cr| cr.name_any() == instance_name).map(|cr| {
            SentryInstance {
                secret_store_path: cr.spec.secret_store_path.clone(),
                url: cr.spec.url.clone(),
                organization: cr.spec.organization.clone(),
            }
        }))
    }
}
