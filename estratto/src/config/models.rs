//! Configuration model definitions.
//!
//! [`PipelineConfig`] is built once at pipeline entry and read-only for the
//! duration of a run. Every field has a serde default so partial files and
//! sparse environments deserialize cleanly; CSV-valued environment variables
//! (`NER_SUPPORTED_LANGUAGES=it,en`) are accepted wherever a list is
//! expected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};

use crate::types::Source;

/// Main configuration for an extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Confidence assigned to regex hits.
    pub regex_confidence: f64,

    /// Floor for NER hits; model scores below it are clamped up.
    pub ner_confidence: f64,

    /// Confidence assigned to lexicon hits.
    pub lexicon_confidence: f64,

    /// Below this many characters, NER is skipped with `text_too_short`.
    pub min_text_length_for_ner: usize,

    /// Hard cap per NER invocation, in seconds.
    pub ner_timeout_seconds: f64,

    /// Input texts longer than this are rejected at validation.
    pub max_text_length: usize,

    /// ISO codes the NER backend understands.
    #[serde(deserialize_with = "de_string_set")]
    pub supported_ner_languages: BTreeSet<String>,

    /// Conflict-resolution order, highest priority first.
    #[serde(deserialize_with = "de_source_list")]
    pub source_priority: Vec<Source>,

    /// Master switch for the regex engine.
    pub engine_regex_enabled: bool,

    /// Master switch for the NER engine.
    pub engine_ner_enabled: bool,

    /// Master switch for the lexicon engine.
    pub engine_lexicon_enabled: bool,

    /// Per-type switches; types not listed default to enabled.
    pub entity_types_enabled: BTreeMap<String, bool>,

    /// Case-insensitive drop list applied to entity values.
    #[serde(deserialize_with = "de_string_list")]
    pub blacklist_values: Vec<String>,

    /// Identifier handed to the NER model loader.
    pub ner_model_name: String,

    /// Version stamp carried by regex-produced entities.
    pub regex_rule_version: String,

    /// Lemma → entity label dictionary for the lexicon engine.
    pub lexicon: BTreeMap<String, String>,

    /// Logging configuration consumed by [`crate::logging::init`].
    pub logging: LoggingConfig,
}

fn default_regex_confidence() -> f64 {
    0.95
}
fn default_ner_confidence() -> f64 {
    0.70
}
fn default_lexicon_confidence() -> f64 {
    0.90
}
fn default_min_text_length_for_ner() -> usize {
    20
}
fn default_ner_timeout_seconds() -> f64 {
    2.0
}
fn default_max_text_length() -> usize {
    100_000
}
fn default_supported_ner_languages() -> BTreeSet<String> {
    ["it", "en"].into_iter().map(str::to_string).collect()
}
fn default_source_priority() -> Vec<Source> {
    vec![Source::Regex, Source::Ner, Source::Lexicon]
}
fn default_regex_rule_version() -> String {
    "regex-v1.0".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            regex_confidence: default_regex_confidence(),
            ner_confidence: default_ner_confidence(),
            lexicon_confidence: default_lexicon_confidence(),
            min_text_length_for_ner: default_min_text_length_for_ner(),
            ner_timeout_seconds: default_ner_timeout_seconds(),
            max_text_length: default_max_text_length(),
            supported_ner_languages: default_supported_ner_languages(),
            source_priority: default_source_priority(),
            engine_regex_enabled: true,
            engine_ner_enabled: true,
            engine_lexicon_enabled: true,
            entity_types_enabled: BTreeMap::new(),
            blacklist_values: Vec::new(),
            ner_model_name: String::new(),
            regex_rule_version: default_regex_rule_version(),
            lexicon: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Rank of a source in the priority order; lower ranks win conflicts.
    /// Sources absent from the configured order rank last.
    pub fn source_rank(&self, source: Source) -> usize {
        self.source_priority
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.source_priority.len())
    }

    /// Whether a given entity tag may appear in the output. Types without an
    /// explicit entry are enabled.
    pub fn entity_type_enabled(&self, tag: &str) -> bool {
        self.entity_types_enabled.get(tag).copied().unwrap_or(true)
    }

    /// The engine switches, as reported in `meta.feature_flags`.
    pub fn feature_flags(&self) -> BTreeMap<String, bool> {
        BTreeMap::from([
            ("engine_regex_enabled".to_string(), self.engine_regex_enabled),
            ("engine_ner_enabled".to_string(), self.engine_ner_enabled),
            ("engine_lexicon_enabled".to_string(), self.engine_lexicon_enabled),
        ])
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines, one object per event
    Json,

    /// Compact single-line format
    Compact,

    /// Multi-line human-readable format
    Pretty,
}

// ---------------------------------------------------------------------------
// List-or-CSV deserialization helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum CsvOrSeq {
    Csv(String),
    Seq(Vec<String>),
}

impl CsvOrSeq {
    fn into_vec(self) -> Vec<String> {
        match self {
            CsvOrSeq::Csv(s) => s
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            CsvOrSeq::Seq(v) => v,
        }
    }
}

fn de_string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(CsvOrSeq::deserialize(deserializer)?.into_vec())
}

fn de_string_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<String>, D::Error> {
    Ok(CsvOrSeq::deserialize(deserializer)?
        .into_vec()
        .into_iter()
        .map(|item| item.to_lowercase())
        .collect())
}

fn de_source_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Source>, D::Error> {
    CsvOrSeq::deserialize(deserializer)?
        .into_vec()
        .into_iter()
        .map(|name| {
            Source::parse(&name).ok_or_else(|| D::Error::custom(format!("unknown entity source: {name}")))
        })
        .collect()
}
