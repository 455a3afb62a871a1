use crate::admission::{AdmissionResponse, AdmissionReview};
use crate::state::WebhookState;

use axum::extract::State;
use axum::response::Json;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use tenantbind_k8s_util::workload::WorkloadMeta;
use tracing::{debug, error};

fn wrap(response: AdmissionResponse) -> AdmissionReview<()> {
    AdmissionReview {
        api_version: "admission.k8s.io/v1".to_string(),
        kind: "AdmissionReview".to_string(),
        request: None,
        response: Some(response),
    }
}

/// Diffs `before`/`after`'s JSON forms into the base64 JSON Patch document the API server
/// applies, or denies the request if either side fails to serialize.
fn diff_response<T: serde::Serialize>(uid: String, before: &T, after: &T) -> AdmissionResponse {
    let (original, mutated) = match (serde_json::to_value(before), serde_json::to_value(after)) {
        (Ok(o), Ok(m)) => (o, m),
        _ => {
            error!("failed to serialize admission object for diffing");
            return AdmissionResponse::deny(uid, "internal error serializing object");
        }
    };
    let patch = json_patch::diff(&original, &mutated);
    match serde_json::to_vec(&patch) {
        Ok(bytes) => AdmissionResponse::patch(uid, &bytes),
        Err(e) => {
            error!(msg = "failed to encode JSON patch", %e);
            AdmissionResponse::deny(uid, "internal error encoding patch")
        }
    }
}

pub async fn mutate_deployment(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<Deployment>>,
) -> Json<AdmissionReview<()>> {
    let Some(request) = review.request else {
        error!("missing request in admission review");
        return Json(wrap(AdmissionResponse::deny("unknown".to_string(), "missing request")));
    };
    let uid = request.uid;
    if request.operation != "CREATE" && request.operation != "UPDATE" {
        return Json(wrap(AdmissionResponse::allow(uid)));
    }
    let Some(mut deployment) = request.object else {
        error!("missing object in admission request");
        return Json(wrap(AdmissionResponse::deny(uid, "missing object")));
    };

    let meta = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.metadata.as_ref())
        .map(WorkloadMeta::from_object_meta)
        .unwrap_or_default();

    let original = deployment.clone();
    let Some(pod_spec) = deployment.spec.as_mut().and_then(|spec| spec.template.spec.as_mut()) else {
        debug!("deployment template carries no pod spec, allowing unmodified");
        return Json(wrap(AdmissionResponse::allow(uid)));
    };

    match state.dispatcher.admit(&meta, pod_spec).await {
        Ok(false) => Json(wrap(AdmissionResponse::allow(uid))),
        Ok(true) => Json(wrap(diff_response(uid, &original, &deployment))),
        Err(e) => {
            debug!(msg = "admission reconciliation failed", %e);
            Json(wrap(AdmissionResponse::deny(uid, e.to_string())))
        }
    }
}

pub async fn mutate_pod(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<Pod>>,
) -> Json<AdmissionReview<()>> {
    let Some(request) = review.request else {
        error!("missing request in admission review");
        return Json(wrap(AdmissionResponse::deny("unknown".to_string(), "missing request")));
    };
    let uid = request.uid;
    if request.operation != "CREATE" {
        return Json(wrap(AdmissionResponse::allow(uid)));
    }
    let Some(mut pod) = request.object else {
        error!("missing object in admission request");
        return Json(wrap(AdmissionResponse::deny(uid, "missing object")));
    };

    let meta = WorkloadMeta::from_object_meta(&pod.metadata);

    let original = pod.clone();
    let Some(pod_spec) = pod.spec.as_mut() else {
        debug!("pod carries no pod spec, allowing unmodified");
        return Json(wrap(AdmissionResponse::allow(uid)));
    };

    match state.dispatcher.admit(&meta, pod_spec).await {
        Ok(false) => Json(wrap(AdmissionResponse::allow(uid))),
        Ok(true) => Json(wrap(diff_response(uid, &original, &pod))),
        Err(e) => {
            debug!(msg = "admission reconciliation failed", %e);
            Json(wrap(AdmissionResponse::deny(uid, e.to_string())))
        }
    }
}
