//! The JSON envelope returned by every pipeline run.
//!
//! Whatever happens inside the pipeline (validation rejection, engine
//! faults, even a panic caught by the orchestrator barrier) the caller
//! receives an [`ExtractionOutput`] that serializes to a valid JSON document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Entity;

/// Version stamp carried in `meta.layer_version` of every envelope.
pub const LAYER_VERSION: &str = "1.0.0";

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Ok,
    Failed,
}

/// One error or warning record attached to the envelope.
///
/// `field` names the offending input field for validation errors and the
/// component for internal faults; `error_type` distinguishes hard rejections
/// (`missing_field`, `text_too_long`, …) from non-blocking `warning` records
/// and barrier-caught `internal` faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl RecordedError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            error_type: error_type.into(),
        }
    }

    /// Non-blocking record; the pipeline proceeds.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, message, "warning")
    }

    /// Fault caught by the orchestrator barrier.
    pub fn internal(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, message, "internal")
    }
}

impl std::fmt::Display for RecordedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.message, self.error_type)
    }
}

/// Run metadata carried alongside the entity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMeta {
    pub status: PipelineStatus,
    pub layer_version: String,
    pub feature_flags: BTreeMap<String, bool>,
    pub component_timings_ms: BTreeMap<String, f64>,
    /// Recorded skip decisions, e.g. NER gating reasons.
    pub fallbacks: Vec<String>,
}

impl PipelineMeta {
    pub fn new(status: PipelineStatus, feature_flags: BTreeMap<String, bool>) -> Self {
        Self {
            status,
            layer_version: LAYER_VERSION.to_string(),
            feature_flags,
            component_timings_ms: BTreeMap::new(),
            fallbacks: Vec::new(),
        }
    }
}

/// The top-level document returned from the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub entities: Vec<Entity>,
    pub meta: PipelineMeta,
    pub errors: Vec<RecordedError>,
}

impl ExtractionOutput {
    /// A failed envelope: empty entities, populated errors.
    pub fn failed(errors: Vec<RecordedError>, feature_flags: BTreeMap<String, bool>) -> Self {
        Self {
            entities: Vec::new(),
            meta: PipelineMeta::new(PipelineStatus::Failed, feature_flags),
            errors,
        }
    }

    /// Serialize into a JSON value. The envelope types only contain
    /// string-keyed maps and finite numbers, so this cannot fail in practice;
    /// should it ever, a minimal failed document is returned instead of an
    /// error so the envelope contract holds unconditionally.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "entities": [],
                "meta": {
                    "status": "failed",
                    "layer_version": LAYER_VERSION,
                    "feature_flags": {},
                    "component_timings_ms": {},
                    "fallbacks": [],
                },
                "errors": [{
                    "field": "envelope",
                    "message": format!("envelope serialization failed: {e}"),
                    "type": "internal",
                }],
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_envelope_has_empty_entities_and_errors() {
        let out = ExtractionOutput::failed(
            vec![RecordedError::new("testo_normalizzato", "text is empty", "empty_text")],
            BTreeMap::new(),
        );
        assert!(out.entities.is_empty());
        assert_eq!(out.meta.status, PipelineStatus::Failed);
        assert_eq!(out.errors.len(), 1);

        let json = out.to_value();
        assert_eq!(json["meta"]["status"], "failed");
        assert_eq!(json["errors"][0]["type"], "empty_text");
        assert_eq!(json["meta"]["layer_version"], LAYER_VERSION);
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let out = ExtractionOutput {
            entities: Vec::new(),
            meta: PipelineMeta::new(PipelineStatus::Ok, BTreeMap::new()),
            errors: vec![RecordedError::warning("lingua", "lingua_missing")],
        };
        let text = serde_json::to_string(&out).unwrap();
        let parsed: ExtractionOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, out);
    }
}
