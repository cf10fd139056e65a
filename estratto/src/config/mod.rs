//! Configuration system for the extraction pipeline.
//!
//! [`PipelineConfig`] can be built from defaults, from a YAML/JSON file, and
//! from `NER_`-prefixed environment variables, merged in that order.
//! [`PipelineConfig::from_env`] is the one-call entry point used by binaries.

mod loader;
mod models;
#[cfg(test)]
mod tests;
mod validation;

pub use loader::ConfigLoader;
pub use models::{LogFormat, LogLevel, LoggingConfig, PipelineConfig};
pub use validation::validate_config;

/// Environment variable prefix for pipeline configuration.
pub const ENV_PREFIX: &str = "NER_";

/// Environment variable naming the optional configuration file.
pub const ENV_CONFIG_FILE: &str = "NER_CONFIG_FILE";

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error occurred during file loading
    #[error("Failed to load configuration file: {0}")]
    FileLoadError(String),

    /// Error occurred during validation
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Error occurred during parsing
    #[error("Configuration parsing error: {0}")]
    ParseError(String),

    /// General error
    #[error("{0}")]
    Other(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl PipelineConfig {
    /// Build a configuration from the process environment: defaults, then the
    /// file named by `NER_CONFIG_FILE` (if set), then `NER_*` variables.
    pub fn from_env() -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Ok(path) = std::env::var(ENV_CONFIG_FILE)
            && !path.trim().is_empty()
        {
            loader.load_file(&path)?;
        }
        loader.load_env();
        loader.extract()
    }
}
