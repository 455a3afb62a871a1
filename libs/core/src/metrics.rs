use std::sync::Arc;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ConnectorLabels {
    connector: String,
}

/// Per-connector reconcile/mutation counters, registered once at startup and shared across the
/// controller and webhook binaries.
pub struct Metrics {
    pub registry: Registry,
    reconcile_total: Family<ConnectorLabels, Counter>,
    reconcile_failures_total: Family<ConnectorLabels, Counter>,
    mutations_total: Family<ConnectorLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let reconcile_total = Family::default();
        let reconcile_failures_total = Family::default();
        let mutations_total = Family::default();

        registry.register(
            "reconcile",
            "Number of reconciliations run per connector",
            reconcile_total.clone(),
        );
        registry.register(
            "reconcile_failures",
            "Number of failed reconciliations per connector",
            reconcile_failures_total.clone(),
        );
        registry.register(
            "mutations",
            "Number of pod templates mutated per connector",
            mutations_total.clone(),
        );

        Self {
            registry,
            reconcile_total,
            reconcile_failures_total,
            mutations_total,
        }
    }

    pub fn reconcile_inc(&self, connector: &str) {
        self.reconcile_total
            .get_or_create(&ConnectorLabels { connector: connector.to_string() })
            .inc();
    }

    pub fn reconcile_failure_inc(&self, connector: &str) {
        self.reconcile_failures_total
            .get_or_create(&ConnectorLabels { connector: connector.to_string() })
            .inc();
    }

    pub fn mutation_inc(&self, connector: &str) {
        self.mutations_total
            .get_or_create(&ConnectorLabels { connector: connector.to_string() })
            .inc();
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedMetrics = Arc<Metrics>;
