use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct AdmissionReview<T> {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub request: Option<AdmissionRequest<T>>,
    pub response: Option<AdmissionResponse>,
}

#[derive(Deserialize, Serialize)]
pub struct AdmissionRequest<T> {
    pub uid: String,
    pub operation: String,
    pub object: Option<T>,
}

#[derive(Deserialize, Serialize)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(rename = "patchType", skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

#[derive(Deserialize, Serialize)]
pub struct Status {
    pub message: String,
}

impl AdmissionResponse {
    pub fn allow(uid: String) -> Self {
        Self {
            uid,
            allowed: true,
            status: None,
            patch: None,
            patch_type: None,
        }
    }

    pub fn deny(uid: String, message: impl Into<String>) -> Self {
        Self {
            uid,
            allowed: false,
            status: Some(Status { message: message.into() }),
            patch: None,
            patch_type: None,
        }
    }

    /// Allow, carrying a base64-encoded JSON Patch (RFC 6902) document the API server applies
    /// to the admitted object.
    pub fn patch(uid: String, patch_document: &[u8]) -> Self {
        use base64::Engine;
        Self {
            uid,
            allowed: true,
            status: None,
            patch: Some(base64::engine::general_purpose::STANDARD.encode(patch_document)),
            patch_type: Some("JSONPatch".to_string()),
        }
    }
}

impl<T> AdmissionReview<T> {
    pub fn response(self, response: AdmissionResponse) -> AdmissionReview<()> {
        AdmissionReview {
            api_version: "admission.k8s.io/v1".to_string(),
            kind: "AdmissionReview".to_string(),
            request: None,
            response: Some(response),
        }
    }
}
