use crate::error::{Error, Result};
use crate::secret_store::SecretRef;

use tenantbind_k8s_util::workload::WorkloadMeta;

/// Read a required annotation. Fails with `MissingRequiredAnnotation` if absent, or
/// `EmptyAnnotationValue` if present but blank.
pub fn require_annotation<'a>(meta: &'a WorkloadMeta, key: &str) -> Result<&'a str> {
    let value = meta
        .annotation(key)
        .ok_or_else(|| Error::MissingRequiredAnnotation(key.to_string()))?;
    if value.is_empty() {
        return Err(Error::EmptyAnnotationValue(key.to_string()));
    }
    Ok(value)
}

/// Read a required label. Same failure modes as [`require_annotation`].
pub fn require_label<'a>(meta: &'a WorkloadMeta, key: &str) -> Result<&'a str> {
    let value = meta
        .label(key)
        .ok_or_else(|| Error::MissingRequiredAnnotation(key.to_string()))?;
    if value.is_empty() {
        return Err(Error::EmptyAnnotationValue(key.to_string()));
    }
    Ok(value)
}

/// Read an optional annotation, falling back to a label-derived default when absent. The
/// fallback closure only runs when the annotation itself is missing (not when it's blank —
/// a blank value is still `EmptyAnnotationValue`, matching `require_annotation`).
pub fn optional_annotation_or<'a>(
    meta: &'a WorkloadMeta,
    key: &str,
    default_label: &str,
) -> Result<&'a str> {
    match meta.annotation(key) {
        Some(v) if v.is_empty() => Err(Error::EmptyAnnotationValue(key.to_string())),
        Some(v) => Ok(v),
        None => require_label(meta, default_label),
    }
}

/// Returns `true` only when every annotation/label name in `required` is present on `meta`.
/// Used by each connector's `is_used_by` check.
pub fn has_all(meta: &WorkloadMeta, required_annotations: &[&str], required_labels: &[&str]) -> bool {
    required_annotations.iter().all(|k| meta.annotation(k).is_some())
        && required_labels.iter().all(|k| meta.label(k).is_some())
}

/// Parse a `vault:<mount>/data/<subpath>` annotation value, mapping a malformed value onto
/// `EmptyAnnotationValue` (the annotation is present but not a usable reference).
pub fn parse_vault_path_annotation(meta: &WorkloadMeta, key: &str) -> Result<SecretRef> {
    let raw = require_annotation(meta, key)?;
    SecretRef::parse(raw).ok_or_else(|| Error::EmptyAnnotationValue(key.to_string()))
}
