use crate::crd::{RabbitConnector, RabbitConnectorEntry};

use tenantbind_core::error::Result;
use tenantbind_core::registry::InstanceRegistry;

use kube::runtime::reflector::Store;

/// Backs [`InstanceRegistry`] with a live reflector store of `RabbitConnector` custom resources,
/// flattening every CR's `entries` list into one namespace of instance names.
pub struct CrdRegistry {
    store: Store<RabbitConnector>,
}

impl CrdRegistry {
    pub fn new(store: Store<RabbitConnector>) -> Self {
        Self { store }
    }
}

impl InstanceRegistry<RabbitConnectorEntry> for CrdRegistry {
    fn resolve(&self, instance_name: &str) -> Result<Option<RabbitConnectorEntry>> {
        Ok(self
            .store
            .state()
            .iter()
            .flat_map(|cr| cr.spec.entries.clone())
            .find(|entry| entry.name == instance_name))
    }
}
