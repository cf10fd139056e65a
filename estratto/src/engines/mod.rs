//! Extraction engines.
//!
//! Three independent producers of candidate entities, run by the orchestrator
//! in a fixed order: pattern matching, statistical NER behind an adapter
//! trait, and lexicon lookup. Candidates from all three flow into the
//! resolver for fusion.

pub mod lexicon;
pub mod ner;
pub mod regex;

pub use lexicon::{LEXICON_RULE_VERSION, Lexicon, LexiconEngine};
pub use ner::{
    ModelCache, NerEngine, NerError, NerModel, NerModelLoader, NerPrediction, SkipReason,
    UnconfiguredModelLoader,
};
pub use regex::RegexEngine;
