//! Input validation: raw JSON map to [`ExtractionInput`].
//!
//! Validation accumulates: every failed check contributes a record, so a
//! caller sending a message with three problems sees all three at once.
//! Only a missing language is soft; everything else rejects the input.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::envelope::RecordedError;

lazy_static! {
    /// Heuristic tag detector: upstream is expected to deliver pre-cleaned
    /// plain text, so any surviving markup means the message skipped
    /// pre-cleaning and must be rejected.
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[a-zA-Z/][^>]*>").unwrap();
}

/// Warning code attached when `lingua` is null.
pub const WARNING_LINGUA_MISSING: &str = "lingua_missing";

const REQUIRED_STRING_FIELDS: &[&str] = &[
    "id_conversazione",
    "id_messaggio",
    "testo_normalizzato",
    "timestamp",
    "mittente",
    "destinatario",
];

/// A validated extraction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionInput {
    pub id_conversazione: String,
    pub id_messaggio: String,
    pub testo_normalizzato: String,
    pub lingua: Option<String>,
    pub timestamp: String,
    pub mittente: String,
    pub destinatario: String,
    /// Upstream annotations, passed through untouched.
    pub pre_annotations: Option<Value>,
    pub routing_rules: Option<Value>,
    pub upstream_tags: Option<Value>,
}

/// Rejection carrying every failed check as a `{field, message, type}` record.
#[derive(Debug, Clone, thiserror::Error)]
#[error("input validation failed with {} error(s)", errors.len())]
pub struct InputValidationError {
    pub errors: Vec<RecordedError>,
}

/// Validate a raw message document.
///
/// Returns the typed input plus soft warnings (currently only
/// [`WARNING_LINGUA_MISSING`]), or an [`InputValidationError`] listing every
/// violated rule.
pub fn validate_input(
    raw: &Value,
    max_text_length: usize,
) -> Result<(ExtractionInput, Vec<String>), InputValidationError> {
    let Some(map) = raw.as_object() else {
        return Err(InputValidationError {
            errors: vec![RecordedError::new(
                "input",
                "input must be a JSON object",
                "invalid_type",
            )],
        });
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut string_field = |field: &str| -> Option<String> {
        match map.get(field) {
            None | Some(Value::Null) => {
                errors.push(RecordedError::new(
                    field,
                    format!("required field '{field}' is missing"),
                    "missing_field",
                ));
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                errors.push(RecordedError::new(
                    field,
                    format!("field '{field}' must be a string, got {}", json_type_name(other)),
                    "invalid_type",
                ));
                None
            }
        }
    };

    let id_conversazione = string_field("id_conversazione");
    let id_messaggio = string_field("id_messaggio");
    let testo_normalizzato = string_field("testo_normalizzato");
    let timestamp = string_field("timestamp");
    let mittente = string_field("mittente");
    let destinatario = string_field("destinatario");

    let lingua = match map.get("lingua") {
        None | Some(Value::Null) => {
            warnings.push(WARNING_LINGUA_MISSING.to_string());
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(RecordedError::new(
                "lingua",
                format!("field 'lingua' must be a string or null, got {}", json_type_name(other)),
                "invalid_type",
            ));
            None
        }
    };

    if let Some(text) = &testo_normalizzato {
        if text.trim().is_empty() {
            errors.push(RecordedError::new(
                "testo_normalizzato",
                "text is empty or whitespace-only",
                "empty_text",
            ));
        }
        if text.len() > max_text_length {
            errors.push(RecordedError::new(
                "testo_normalizzato",
                format!("text length {} exceeds the limit of {max_text_length}", text.len()),
                "text_too_long",
            ));
        }
        if HTML_TAG_RE.is_match(text) {
            errors.push(RecordedError::new(
                "testo_normalizzato",
                "text contains raw HTML markup",
                "html_detected",
            ));
        }
    }

    if !errors.is_empty() {
        return Err(InputValidationError { errors });
    }

    // Every required field produced a value above, otherwise `errors` would
    // be non-empty; the unwrap_or_default arms are unreachable.
    let input = ExtractionInput {
        id_conversazione: id_conversazione.unwrap_or_default(),
        id_messaggio: id_messaggio.unwrap_or_default(),
        testo_normalizzato: testo_normalizzato.unwrap_or_default(),
        lingua,
        timestamp: timestamp.unwrap_or_default(),
        mittente: mittente.unwrap_or_default(),
        destinatario: destinatario.unwrap_or_default(),
        pre_annotations: map.get("pre_annotations").cloned(),
        routing_rules: map.get("routing_rules").cloned(),
        upstream_tags: map.get("upstream_tags").cloned(),
    };

    Ok((input, warnings))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_message() -> Value {
        json!({
            "id_conversazione": "c-42",
            "id_messaggio": "m-7",
            "testo_normalizzato": "Buongiorno, in allegato la fattura.",
            "lingua": "it",
            "timestamp": "2026-02-03T10:00:00Z",
            "mittente": "mario.rossi@example.com",
            "destinatario": "triage@example.com",
        })
    }

    #[test]
    fn accepts_a_well_formed_message() {
        let (input, warnings) = validate_input(&valid_message(), 100_000).unwrap();
        assert_eq!(input.id_conversazione, "c-42");
        assert_eq!(input.lingua.as_deref(), Some("it"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let err = validate_input(&json!({"testo_normalizzato": "ciao mondo"}), 100_000).unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"id_conversazione"));
        assert!(fields.contains(&"id_messaggio"));
        assert!(fields.contains(&"timestamp"));
        assert!(fields.contains(&"mittente"));
        assert!(fields.contains(&"destinatario"));
        assert!(err.errors.iter().all(|e| e.error_type == "missing_field"));
    }

    #[test]
    fn rejects_whitespace_only_text() {
        let mut msg = valid_message();
        msg["testo_normalizzato"] = json!("   \n\t  ");
        let err = validate_input(&msg, 100_000).unwrap_err();
        assert!(err.errors.iter().any(|e| e.error_type == "empty_text"));
    }

    #[test]
    fn rejects_oversized_text() {
        let mut msg = valid_message();
        msg["testo_normalizzato"] = json!("a".repeat(51));
        let err = validate_input(&msg, 50).unwrap_err();
        assert!(err.errors.iter().any(|e| e.error_type == "text_too_long"));
    }

    #[test]
    fn rejects_html_markup() {
        let mut msg = valid_message();
        msg["testo_normalizzato"] = json!("Gentile cliente, <b>clicchi qui</b>");
        let err = validate_input(&msg, 100_000).unwrap_err();
        assert!(err.errors.iter().any(|e| e.error_type == "html_detected"));
    }

    #[test]
    fn plain_angle_brackets_are_not_markup() {
        let mut msg = valid_message();
        msg["testo_normalizzato"] = json!("importo < 100 e > 50");
        assert!(validate_input(&msg, 100_000).is_ok());
    }

    #[test]
    fn null_lingua_is_a_warning_not_an_error() {
        let mut msg = valid_message();
        msg["lingua"] = Value::Null;
        let (input, warnings) = validate_input(&msg, 100_000).unwrap();
        assert_eq!(input.lingua, None);
        assert_eq!(warnings, vec![WARNING_LINGUA_MISSING.to_string()]);
    }

    #[test]
    fn non_string_field_is_a_type_error() {
        let mut msg = valid_message();
        msg["id_messaggio"] = json!(17);
        let err = validate_input(&msg, 100_000).unwrap_err();
        assert!(
            err.errors
                .iter()
                .any(|e| e.field == "id_messaggio" && e.error_type == "invalid_type")
        );
    }

    #[test]
    fn non_object_input_is_rejected_outright() {
        let err = validate_input(&json!([1, 2, 3]), 100_000).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].error_type, "invalid_type");
    }

    #[test]
    fn optional_passthrough_fields_survive() {
        let mut msg = valid_message();
        msg["upstream_tags"] = json!(["spam-checked"]);
        let (input, _) = validate_input(&msg, 100_000).unwrap();
        assert_eq!(input.upstream_tags, Some(json!(["spam-checked"])));
        assert_eq!(input.pre_annotations, None);
    }
}
