//! Configuration validation.

use std::collections::BTreeSet;

use super::{ConfigError, PipelineConfig, Result};

/// Validate a configuration, returning the first violated rule.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    for (name, value) in [
        ("regex_confidence", config.regex_confidence),
        ("ner_confidence", config.ner_confidence),
        ("lexicon_confidence", config.lexicon_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be within [0.0, 1.0], got {value}"
            )));
        }
    }

    if !config.ner_timeout_seconds.is_finite() || config.ner_timeout_seconds <= 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "ner_timeout_seconds must be a positive number, got {}",
            config.ner_timeout_seconds
        )));
    }

    if config.max_text_length == 0 {
        return Err(ConfigError::ValidationError(
            "max_text_length must be greater than 0".to_string(),
        ));
    }

    if config.source_priority.is_empty() {
        return Err(ConfigError::ValidationError(
            "source_priority must name at least one source".to_string(),
        ));
    }

    let distinct: BTreeSet<_> = config.source_priority.iter().collect();
    if distinct.len() != config.source_priority.len() {
        return Err(ConfigError::ValidationError(
            "source_priority must not repeat a source".to_string(),
        ));
    }

    Ok(())
}
