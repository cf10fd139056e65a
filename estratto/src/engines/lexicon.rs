//! Lemma-based dictionary lookup.
//!
//! A [`Lexicon`] maps lemmas to entity labels (`"ACME S.p.A." → "AZIENDA"`).
//! Matches are case-insensitive whole-word occurrences; the emitted entity is
//! typed by the *label*, never by the lemma, and its value preserves the
//! original casing found in the text.

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder, escape};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::types::{Entity, EntityType, Source, Span};

/// Version stamp carried by lexicon-produced entities.
pub const LEXICON_RULE_VERSION: &str = "lexicon-v1.0";

/// An immutable lemma → entity label dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    entries: BTreeMap<String, String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(lemma, label)| (lemma.into(), label.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, lemma: impl Into<String>, label: impl Into<String>) {
        self.entries.insert(lemma.into(), label.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

/// Dictionary-driven entity extractor.
#[derive(Debug, Clone, Default)]
pub struct LexiconEngine {
    /// One compiled matcher per lemma, in deterministic lemma order.
    matchers: Vec<(Regex, String)>,
}

impl LexiconEngine {
    /// Compile the lexicon into case-insensitive whole-word matchers.
    pub fn new(lexicon: &Lexicon) -> Self {
        let matchers = lexicon
            .iter()
            .filter(|(lemma, _)| !lemma.trim().is_empty())
            .filter_map(|(lemma, label)| {
                match compile_lemma(lemma) {
                    Ok(pattern) => Some((pattern, label.clone())),
                    Err(error) => {
                        tracing::warn!(lemma = %lemma, error = %error, "skipping uncompilable lemma");
                        None
                    }
                }
            })
            .collect();
        Self { matchers }
    }

    /// Find every lemma occurrence in the normalized text.
    pub fn extract(&self, text: &str, config: &PipelineConfig) -> Vec<Entity> {
        let mut entities = Vec::new();
        for (pattern, label) in &self.matchers {
            for m in pattern.find_iter(text) {
                if m.as_str().trim().is_empty() {
                    continue;
                }
                entities.push(Entity::new(
                    EntityType::from_tag(label),
                    // Original casing from the text, not the lemma's.
                    m.as_str().to_string(),
                    Span::new(m.start(), m.end()),
                    config.lexicon_confidence,
                    Source::Lexicon,
                    LEXICON_RULE_VERSION,
                ));
            }
        }
        entities
    }
}

/// Escape a lemma and fence it with word boundaries where its edges are word
/// characters. A lemma ending in `.` (like "S.p.A.") cannot take a trailing
/// `\b`, since the boundary would then require a following word character.
fn compile_lemma(lemma: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::new();
    if lemma.chars().next().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&escape(lemma));
    if lemma.chars().last().is_some_and(is_word_char) {
        pattern.push_str(r"\b");
    }
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(pairs: &[(&str, &str)]) -> LexiconEngine {
        LexiconEngine::new(&Lexicon::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn labels_come_from_the_entity_class_not_the_lemma() {
        let engine = engine(&[("ACME", "AZIENDA")]);
        let entities = engine.extract("Fattura emessa da ACME ieri", &PipelineConfig::default());
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, EntityType::Azienda);
        assert_eq!(entities[0].entity_type.as_str(), "AZIENDA");
        assert_eq!(entities[0].value, "ACME");
        assert_eq!(entities[0].source, Source::Lexicon);
        assert_eq!(entities[0].version, LEXICON_RULE_VERSION);
    }

    #[test]
    fn matching_is_case_insensitive_but_value_keeps_text_casing() {
        let engine = engine(&[("acme s.p.a.", "AZIENDA")]);
        let text = "contratto con Acme S.p.A. firmato";
        let entities = engine.extract(text, &PipelineConfig::default());
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].value, "Acme S.p.A.");
        assert_eq!(
            &text[entities[0].span.start..entities[0].span.end],
            "Acme S.p.A."
        );
    }

    #[test]
    fn whole_word_matching_avoids_substrings() {
        let engine = engine(&[("ACME", "AZIENDA")]);
        let entities = engine.extract("acmeide non è acme", &PipelineConfig::default());
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].value, "acme");
    }

    #[test]
    fn every_occurrence_is_reported() {
        let engine = engine(&[("ACME", "AZIENDA")]);
        let entities = engine.extract("ACME contro ACME", &PipelineConfig::default());
        assert_eq!(entities.len(), 2);
        assert!(entities[0].span.start < entities[1].span.start);
    }

    #[test]
    fn unknown_labels_pass_through_as_custom_types() {
        let engine = engine(&[("tribunale di milano", "SEDE_GIUDIZIARIA")]);
        let entities = engine.extract(
            "udienza presso il Tribunale di Milano",
            &PipelineConfig::default(),
        );
        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].entity_type,
            EntityType::Custom("SEDE_GIUDIZIARIA".to_string())
        );
    }

    #[test]
    fn empty_lexicon_finds_nothing() {
        let engine = engine(&[]);
        assert!(
            engine
                .extract("ACME S.p.A.", &PipelineConfig::default())
                .is_empty()
        );
    }

    #[test]
    fn confidence_comes_from_config() {
        let config = PipelineConfig {
            lexicon_confidence: 0.42,
            ..Default::default()
        };
        let engine = engine(&[("ACME", "AZIENDA")]);
        let entities = engine.extract("ACME", &config);
        assert_eq!(entities[0].confidence, 0.42);
    }
}
