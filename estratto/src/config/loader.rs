//! Configuration loader.
//!
//! Merges sources through figment: built-in defaults, then an optional
//! YAML/JSON file, then `NER_`-prefixed environment variables. A handful of
//! environment names are historical shorthands (`NER_BLACKLIST`,
//! `NER_MODEL_NAME`, `NER_SUPPORTED_LANGUAGES`) and are remapped onto the
//! matching config fields.

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Yaml};
use std::path::Path;

use super::{ConfigError, ENV_PREFIX, PipelineConfig, Result, validation};

/// Environment variable names (sans prefix, lowercased) that map onto config
/// fields; anything else under the prefix is ignored with a warning.
const KNOWN_ENV_KEYS: &[&str] = &[
    "config_file",
    "regex_confidence",
    "ner_confidence",
    "lexicon_confidence",
    "min_text_length_for_ner",
    "ner_timeout_seconds",
    "max_text_length",
    "supported_languages",
    "source_priority",
    "engine_regex_enabled",
    "engine_ner_enabled",
    "engine_lexicon_enabled",
    "blacklist",
    "model_name",
];

/// Configuration loader that handles loading from multiple sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    figment: Figment,
}

impl ConfigLoader {
    /// Create a new configuration loader seeded with the default values.
    pub fn new() -> Self {
        let figment = Figment::new().merge(Serialized::defaults(PipelineConfig::default()));
        Self { figment }
    }

    /// Merge a configuration file. The format is chosen by extension; only
    /// YAML and JSON are part of the supported option set.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileLoadError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => {
                let figment = std::mem::take(&mut self.figment).merge(Yaml::file(path));
                self.figment = figment;
            }
            Some("json") => {
                let figment = std::mem::take(&mut self.figment).merge(Json::file(path));
                self.figment = figment;
            }
            _ => {
                return Err(ConfigError::FileLoadError(format!(
                    "Unsupported file format: {}",
                    path.display()
                )));
            }
        }

        Ok(self)
    }

    /// Merge `NER_*` environment variables. Unknown keys under the prefix are
    /// skipped with a warning rather than rejected.
    pub fn load_env(&mut self) -> &mut Self {
        warn_unknown_env_keys();

        let env = Env::prefixed(ENV_PREFIX)
            .ignore(&["config_file"])
            .map(|key| rename_env_key(key.as_str()).to_string().into());
        let figment = std::mem::take(&mut self.figment).merge(env);
        self.figment = figment;
        self
    }

    /// Merge configuration from a custom figment provider.
    pub fn merge<T: figment::Provider>(&mut self, provider: T) -> &mut Self {
        let figment = std::mem::take(&mut self.figment).merge(provider);
        self.figment = figment;
        self
    }

    /// Extract and validate the configuration.
    pub fn extract(&self) -> Result<PipelineConfig> {
        let config: PipelineConfig = self
            .figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validation::validate_config(&config)?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate the historical environment names onto their config fields.
fn rename_env_key(key: &str) -> &str {
    match key.to_ascii_lowercase().as_str() {
        "supported_languages" => "supported_ner_languages",
        "blacklist" => "blacklist_values",
        "model_name" => "ner_model_name",
        _ => key,
    }
}

fn warn_unknown_env_keys() {
    for (name, _) in std::env::vars() {
        if let Some(stripped) = name.strip_prefix(ENV_PREFIX) {
            let key = stripped.to_ascii_lowercase();
            if !KNOWN_ENV_KEYS.contains(&key.as_str()) {
                tracing::warn!(variable = %name, "ignoring unknown configuration variable");
            }
        }
    }
}
