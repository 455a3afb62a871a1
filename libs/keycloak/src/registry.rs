use crate::crd::KeycloakConnector;
use crate::reconcile::KeycloakInstance;

use tenantbind_core::error::Result;
use tenantbind_core::registry::InstanceRegistry;

use kube::runtime::reflector::Store;
use kube::ResourceExt;

/// Backs [`InstanceRegistry`] with a live reflector store of `KeycloakConnector` custom
/// resources. Each CR's own name is the instance name, since a Keycloak connector instance is a
/// single object rather than a list.
pub struct CrdRegistry {
    store: Store<KeycloakConnector>,
}

impl CrdRegistry {
    pub fn new(store: Store<KeycloakConnector>) -> Self {
        Self { store }
    }
}

impl InstanceRegistry<KeycloakInstance> for CrdRegistry {
    fn resolve(&self, instance_name: &str) -> Result<Option<KeycloakInstance>> {
        Ok(self.store.state().iter().find(|cr| cr.name_any() == instance_name).map(|cr| {
            KeycloakInstance {
                secret_store_path: cr.spec.secret_store_path.clone(),
                url: cr.spec.url.clone(),
                realm: cr.spec.realm.clone(),
            }
        }))
    }
}
