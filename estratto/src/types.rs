//! Core entity types shared across all pipeline stages.
//!
//! An [`Entity`] is immutable once produced: engines create them, the
//! resolver and filters build new lists rather than editing in place, and the
//! orchestrator owns them until serialization.

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Canonical entity tags emitted by the pipeline.
///
/// The wire representation is the uppercase tag (`"EMAIL"`,
/// `"NUMERO_PRATICA"`, …). Labels outside the canonical set (lexicon labels,
/// exotic NER tags) round-trip through [`EntityType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Email addresses (e.g. "mario.rossi@example.com")
    Email,
    /// Italian fiscal codes (16 alphanumerics, positional pattern)
    CodiceFiscale,
    /// Italian VAT numbers (11 digits, anchored by `IT` prefix or label)
    PartitaIva,
    /// International bank account numbers
    Iban,
    /// Italian phone numbers (mobile, landline, or `+39`-prefixed)
    Telefono,
    /// Calendar dates
    Data,
    /// Monetary amounts adjacent to a `€` sign
    Importo,
    /// Case/file reference numbers
    NumeroPratica,
    /// Organizations and company names
    Azienda,
    /// Any label outside the canonical set
    Custom(String),
}

impl EntityType {
    /// The canonical wire tag for this type.
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Email => "EMAIL",
            EntityType::CodiceFiscale => "CODICEFISCALE",
            EntityType::PartitaIva => "PARTITAIVA",
            EntityType::Iban => "IBAN",
            EntityType::Telefono => "TELEFONO",
            EntityType::Data => "DATA",
            EntityType::Importo => "IMPORTO",
            EntityType::NumeroPratica => "NUMERO_PRATICA",
            EntityType::Azienda => "AZIENDA",
            EntityType::Custom(name) => name,
        }
    }

    /// Map a tag back to a canonical type. `ORG`-style organization tags from
    /// NER backends fold into [`EntityType::Azienda`]; anything unrecognized
    /// is preserved as [`EntityType::Custom`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "EMAIL" => EntityType::Email,
            "CODICEFISCALE" => EntityType::CodiceFiscale,
            "PARTITAIVA" => EntityType::PartitaIva,
            "IBAN" => EntityType::Iban,
            "TELEFONO" => EntityType::Telefono,
            "DATA" => EntityType::Data,
            "IMPORTO" => EntityType::Importo,
            "NUMERO_PRATICA" => EntityType::NumeroPratica,
            "AZIENDA" | "ORG" | "ORGANIZATION" => EntityType::Azienda,
            _ => EntityType::Custom(tag.to_string()),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EntityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(EntityType::from_tag(&tag))
    }
}

/// Which engine produced an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Regex,
    Ner,
    Lexicon,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Regex => "regex",
            Source::Ner => "ner",
            Source::Lexicon => "lexicon",
        }
    }

    /// Parse a source name as used in `source_priority` configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "regex" => Some(Source::Regex),
            "ner" => Some(Source::Ner),
            "lexicon" => Some(Source::Lexicon),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Source::parse(&name)
            .ok_or_else(|| D::Error::custom(format!("unknown entity source: {name}")))
    }
}

/// Half-open byte range `[start, end)` into the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Two spans overlap when they share at least one byte.
    pub fn overlaps(&self, other: Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// An entity extracted from the normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical entity tag.
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// The matched (and possibly canonicalized) string. Never empty.
    pub value: String,
    /// Where the match sits in the normalized text.
    pub span: Span,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Engine that produced this entity.
    pub source: Source,
    /// Identifier of the producing rule set or model.
    pub version: String,
}

impl Entity {
    pub fn new(
        entity_type: EntityType,
        value: impl Into<String>,
        span: Span,
        confidence: f64,
        source: Source,
        version: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            value: value.into(),
            span,
            confidence,
            source,
            version: version.into(),
        }
    }

    /// An entity is valid when its value carries visible content and its span
    /// is a well-formed range inside the normalized text.
    pub fn is_valid(&self, text_len: usize) -> bool {
        !self.value.trim().is_empty() && self.span.start < self.span.end && self.span.end <= text_len
    }

    /// Copy of this entity with a rewritten value. The span is untouched and
    /// keeps addressing the original substring.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }
}
