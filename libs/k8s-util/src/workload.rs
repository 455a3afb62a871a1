use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// The slice of a workload's metadata the connectors care about: annotations and labels.
///
/// Deliberately decoupled from any concrete Kubernetes object type so the intent parser and
/// reconcilers stay free of the event-dispatch framework (admission request, `Deployment`
/// watch event, ...) that produced it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadMeta {
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

impl WorkloadMeta {
    pub fn new(annotations: BTreeMap<String, String>, labels: BTreeMap<String, String>) -> Self {
        Self { annotations, labels }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Lifts a workload's own `ObjectMeta` (pod, pod template, or the object carried by an
    /// admission request) into the connector-facing view.
    pub fn from_object_meta(meta: &ObjectMeta) -> Self {
        Self {
            annotations: meta.annotations.clone().unwrap_or_default(),
            labels: meta.labels.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_maps_lift_to_empty() {
        let meta = ObjectMeta::default();
        let workload = WorkloadMeta::from_object_meta(&meta);
        assert!(workload.annotations.is_empty());
        assert!(workload.labels.is_empty());
    }

    #[test]
    fn present_maps_are_carried_over() {
        let meta = ObjectMeta {
            annotations: Some(BTreeMap::from([("a".to_string(), "1".to_string())])),
            labels: Some(BTreeMap::from([("app".to_string(), "billing".to_string())])),
            ..Default::default()
        };
        let workload = WorkloadMeta::from_object_meta(&meta);
        assert_eq!(workload.annotation("a"), Some("1"));
        assert_eq!(workload.label("app"), Some("billing"));
    }
}
