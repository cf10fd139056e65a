//! Deterministic text canonicalization applied before any engine runs.
//!
//! Four steps, always in the same order: NFKC compatibility normalization,
//! edge trim, space/tab run collapse, newline run collapse. Each step is
//! recorded in a [`NormalizationLog`] so a run can be audited after the fact.
//! The composition is idempotent: normalizing already-normalized text is a
//! no-op.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SPACE_RUN_RE: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref NEWLINE_RUN_RE: Regex = Regex::new(r"[\r\n]+").unwrap();
}

/// One applied normalization step with byte lengths before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationStep {
    pub step: &'static str,
    pub before_len: usize,
    pub after_len: usize,
}

/// Replayable record of a normalization run. Lives only for the duration of
/// one pipeline call; used for audit logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationLog {
    pub steps: Vec<NormalizationStep>,
}

impl NormalizationLog {
    fn record(&mut self, step: &'static str, before_len: usize, after_len: usize) {
        self.steps.push(NormalizationStep {
            step,
            before_len,
            after_len,
        });
    }
}

/// Canonicalize `text`, returning the transformed string and the step log.
pub fn normalize(text: &str) -> (String, NormalizationLog) {
    let mut log = NormalizationLog::default();

    let nfkc: String = text.nfkc().collect();
    log.record("nfkc", text.len(), nfkc.len());

    let trimmed = nfkc.trim().to_string();
    log.record("trim", nfkc.len(), trimmed.len());

    let spaces = SPACE_RUN_RE.replace_all(&trimmed, " ").into_owned();
    log.record("collapse_spaces", trimmed.len(), spaces.len());

    let newlines = NEWLINE_RUN_RE.replace_all(&spaces, "\n").into_owned();
    log.record("collapse_newlines", spaces.len(), newlines.len());

    (newlines, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_space_and_tab_runs() {
        let (out, _) = normalize("fattura   n.\t\t123");
        assert_eq!(out, "fattura n. 123");
    }

    #[test]
    fn collapses_newline_runs_and_carriage_returns() {
        let (out, _) = normalize("riga uno\r\n\r\n\nriga due");
        assert_eq!(out, "riga uno\nriga due");
    }

    #[test]
    fn trims_edges() {
        let (out, _) = normalize("  saldo dovuto  \n");
        assert_eq!(out, "saldo dovuto");
    }

    #[test]
    fn nfkc_folds_compatibility_characters() {
        // U+00A0 NO-BREAK SPACE becomes a plain space and then collapses.
        let (out, _) = normalize("importo\u{00a0}\u{00a0}dovuto");
        assert_eq!(out, "importo dovuto");
        // U+FB01 LATIN SMALL LIGATURE FI decomposes.
        let (out, _) = normalize("\u{fb01}rma");
        assert_eq!(out, "firma");
    }

    #[test]
    fn logs_every_step_in_order() {
        let (_, log) = normalize("  a  b  ");
        let names: Vec<&str> = log.steps.iter().map(|s| s.step).collect();
        assert_eq!(names, vec!["nfkc", "trim", "collapse_spaces", "collapse_newlines"]);
        assert_eq!(log.steps[0].before_len, "  a  b  ".len());
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "  Gentile   Cliente,\r\n\r\nsaldo\u{00a0}€ 1.234,56  ",
            "plain text",
            "\t\tmisto \n\n\n di\trighe\n",
            "",
            "già normalizzato",
        ];
        for sample in samples {
            let (once, _) = normalize(sample);
            let (twice, _) = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn empty_and_whitespace_inputs_normalize_to_empty() {
        assert_eq!(normalize("").0, "");
        assert_eq!(normalize(" \t \n ").0, "");
    }
}
