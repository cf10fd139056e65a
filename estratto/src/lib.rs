//! # Estratto
//!
//! Entity extraction core for email triage pipelines. Given a normalized
//! email message (text plus metadata), estratto produces a deterministic list
//! of typed entities (email addresses, fiscal codes, VAT numbers, IBANs,
//! phone numbers, dates, monetary amounts, case numbers, organizations)
//! with span, confidence, provenance and version information, wrapped in a
//! stable JSON envelope.
//!
//! Three engines feed a fusion stage: a curated regex pattern set, an
//! optional statistical NER backend behind the [`engines::NerModel`] adapter
//! trait, and a lemma lexicon. The resolver deduplicates and prioritizes
//! their candidates, post-filters canonicalize values, and the orchestrator
//! guarantees a valid envelope under every failure mode, panics included.
//!
//! ## Quick start
//!
//! ```rust
//! use estratto::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let message = json!({
//!         "id_conversazione": "c-1",
//!         "id_messaggio": "m-1",
//!         "testo_normalizzato": "Contatto: mario.rossi@example.com, P.IVA IT12345678901",
//!         "lingua": "it",
//!         "timestamp": "2026-02-03T10:00:00Z",
//!         "mittente": "mario.rossi@example.com",
//!         "destinatario": "triage@example.com",
//!     });
//!
//!     let output = run_pipeline(&message, None).await;
//!     assert_eq!(output.meta.status, PipelineStatus::Ok);
//!     assert!(output.entities.iter().any(|e| e.entity_type == EntityType::Email));
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! raw map ──► validate ──► normalize ──► regex ─┐
//!                                       ner ────┼──► resolve ──► filter ──► envelope
//!                                       lexicon ┘
//! ```
//!
//! Configuration comes from [`config::PipelineConfig`]: defaults, an
//! optional YAML/JSON file, and `NER_*` environment variables. Observability
//! is structured `tracing` events plus an optional [`metrics::MetricsSink`];
//! without a sink every metric call is a no-op.

pub mod config;
pub mod engines;
pub mod envelope;
pub mod filters;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod types;

/// The prelude re-exports commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{LogFormat, LogLevel, LoggingConfig, PipelineConfig};
    pub use crate::engines::{
        Lexicon, ModelCache, NerError, NerModel, NerModelLoader, NerPrediction,
    };
    pub use crate::envelope::{ExtractionOutput, LAYER_VERSION, PipelineStatus, RecordedError};
    pub use crate::metrics::{MetricsSink, NoopMetrics};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, extract_all_entities, run_pipeline};
    pub use crate::types::{Entity, EntityType, Source, Span};
    pub use crate::{EstrattoError, Result};
}

pub use config::PipelineConfig;
pub use envelope::{ExtractionOutput, LAYER_VERSION, PipelineStatus};
pub use pipeline::{Pipeline, PipelineBuilder, extract_all_entities, run_pipeline};
pub use types::{Entity, EntityType, Source, Span};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for estratto operations.
///
/// The pipeline itself never returns an error (faults become envelopes),
/// so this type only surfaces from the supporting layers: configuration
/// loading, standalone input validation, NER adapters and logging setup.
#[derive(Debug, thiserror::Error)]
pub enum EstrattoError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// Input validation error
    #[error("Input validation error: {0}")]
    Input(#[from] input::InputValidationError),

    /// NER backend error
    #[error("NER backend error: {0}")]
    Ner(#[from] engines::NerError),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] logging::LogError),

    /// Other unclassified errors
    #[error("{0}")]
    Other(String),
}

/// Result type for estratto operations.
pub type Result<T> = std::result::Result<T, EstrattoError>;
