//! Pattern-based extraction of structured identifiers.
//!
//! Every pattern is anchored enough that free-standing digit runs never
//! match: a VAT number needs its `IT` prefix or a `P.IVA` label, a phone
//! number must fit one of three national shapes. Candidates carry
//! `source=regex` with the configured confidence and rule version.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::PipelineConfig;
use crate::types::{Entity, EntityType, Source, Span};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();

    // Positional letter/digit shape of the Italian fiscal code:
    // surname+name block, year, month letter, day, place code, check letter.
    static ref CODICE_FISCALE_RE: Regex =
        Regex::new(r"\b[A-Za-z]{6}\d{2}[A-Za-z]\d{2}[A-Za-z]\d{3}[A-Za-z]\b").unwrap();

    static ref PARTITA_IVA_PREFIXED_RE: Regex = Regex::new(r"\bIT ?\d{11}\b").unwrap();

    // The label anchors the digits; group 1 is the VAT number itself.
    static ref PARTITA_IVA_LABELED_RE: Regex =
        Regex::new(r"(?i)\b(?:p\.?\s?iva|partita\s+iva)\s*:?\s*(\d{11})\b").unwrap();

    static ref IBAN_RE: Regex = Regex::new(r"\b[A-Za-z]{2}\d{2}[A-Za-z0-9]{11,30}\b").unwrap();

    // Three disjoint national shapes: +39 international, 3xx mobile,
    // 0-prefixed landline.
    static ref TELEFONO_RE: Regex =
        Regex::new(r"\+39 ?\d{9,10}\b|\b3\d{2} ?\d{7}\b|\b0\d{1,3} ?\d{6,8}\b").unwrap();

    static ref DATA_RE: Regex =
        Regex::new(r"\b(0[1-9]|[12]\d|3[01]|[1-9])[/-](0[1-9]|1[0-2]|[1-9])[/-](\d{4})\b").unwrap();

    static ref IMPORTO_RE: Regex = Regex::new(
        r"€ ?\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{1,2})?|\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{1,2})? ?€",
    )
    .unwrap();

    // Group 1 is the reference; a digit check happens in code because the
    // regex crate has no lookahead.
    static ref NUMERO_PRATICA_RE: Regex =
        Regex::new(r"(?i)\b(?:prat\.?|n\.)\s*([A-Za-z0-9][A-Za-z0-9\-/]*)").unwrap();
}

/// Pattern-based entity extractor for structured identifiers.
#[derive(Debug, Clone, Default)]
pub struct RegexEngine;

impl RegexEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pattern set over the normalized text.
    pub fn extract(&self, text: &str, config: &PipelineConfig) -> Vec<Entity> {
        let mut entities = Vec::new();

        self.collect_plain(&EMAIL_RE, EntityType::Email, text, config, &mut entities);
        self.collect_codice_fiscale(text, config, &mut entities);
        self.collect_partita_iva(text, config, &mut entities);
        self.collect_plain(&IBAN_RE, EntityType::Iban, text, config, &mut entities);
        self.collect_plain(&TELEFONO_RE, EntityType::Telefono, text, config, &mut entities);
        self.collect_plain(&DATA_RE, EntityType::Data, text, config, &mut entities);
        self.collect_plain(&IMPORTO_RE, EntityType::Importo, text, config, &mut entities);
        self.collect_numero_pratica(text, config, &mut entities);

        entities.retain(|e| !e.value.trim().is_empty());
        entities
    }

    fn collect_plain(
        &self,
        pattern: &Regex,
        entity_type: EntityType,
        text: &str,
        config: &PipelineConfig,
        out: &mut Vec<Entity>,
    ) {
        if !config.entity_type_enabled(entity_type.as_str()) {
            return;
        }
        for m in pattern.find_iter(text) {
            out.push(self.candidate(
                entity_type.clone(),
                m.as_str().to_string(),
                Span::new(m.start(), m.end()),
                config,
            ));
        }
    }

    fn collect_codice_fiscale(&self, text: &str, config: &PipelineConfig, out: &mut Vec<Entity>) {
        if !config.entity_type_enabled(EntityType::CodiceFiscale.as_str()) {
            return;
        }
        for m in CODICE_FISCALE_RE.find_iter(text) {
            out.push(self.candidate(
                EntityType::CodiceFiscale,
                m.as_str().to_uppercase(),
                Span::new(m.start(), m.end()),
                config,
            ));
        }
    }

    fn collect_partita_iva(&self, text: &str, config: &PipelineConfig, out: &mut Vec<Entity>) {
        if !config.entity_type_enabled(EntityType::PartitaIva.as_str()) {
            return;
        }
        for m in PARTITA_IVA_PREFIXED_RE.find_iter(text) {
            out.push(self.candidate(
                EntityType::PartitaIva,
                m.as_str().to_string(),
                Span::new(m.start(), m.end()),
                config,
            ));
        }
        for caps in PARTITA_IVA_LABELED_RE.captures_iter(text) {
            if let Some(digits) = caps.get(1) {
                out.push(self.candidate(
                    EntityType::PartitaIva,
                    digits.as_str().to_string(),
                    Span::new(digits.start(), digits.end()),
                    config,
                ));
            }
        }
    }

    fn collect_numero_pratica(&self, text: &str, config: &PipelineConfig, out: &mut Vec<Entity>) {
        if !config.entity_type_enabled(EntityType::NumeroPratica.as_str()) {
            return;
        }
        for caps in NUMERO_PRATICA_RE.captures_iter(text) {
            let Some(reference) = caps.get(1) else { continue };
            // A reference without a single digit is prose, not a case number.
            if !reference.as_str().chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            out.push(self.candidate(
                EntityType::NumeroPratica,
                reference.as_str().to_string(),
                Span::new(reference.start(), reference.end()),
                config,
            ));
        }
    }

    fn candidate(
        &self,
        entity_type: EntityType,
        value: String,
        span: Span,
        config: &PipelineConfig,
    ) -> Entity {
        Entity::new(
            entity_type,
            value,
            span,
            config.regex_confidence,
            Source::Regex,
            config.regex_rule_version.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<Entity> {
        RegexEngine::new().extract(text, &PipelineConfig::default())
    }

    fn values_of(entities: &[Entity], entity_type: &EntityType) -> Vec<String> {
        entities
            .iter()
            .filter(|e| &e.entity_type == entity_type)
            .map(|e| e.value.clone())
            .collect()
    }

    #[test]
    fn finds_email_addresses() {
        let entities = extract("Contatto: mario.rossi@example.com, grazie");
        assert_eq!(
            values_of(&entities, &EntityType::Email),
            vec!["mario.rossi@example.com"]
        );
        let email = entities
            .iter()
            .find(|e| e.entity_type == EntityType::Email)
            .unwrap();
        assert_eq!(
            &"Contatto: mario.rossi@example.com, grazie"[email.span.start..email.span.end],
            "mario.rossi@example.com"
        );
        assert_eq!(email.source, Source::Regex);
        assert_eq!(email.version, "regex-v1.0");
        assert_eq!(email.confidence, 0.95);
    }

    #[test]
    fn uppercases_codice_fiscale() {
        let entities = extract("CF: rssmra85t10a562s");
        assert_eq!(
            values_of(&entities, &EntityType::CodiceFiscale),
            vec!["RSSMRA85T10A562S"]
        );
    }

    #[test]
    fn partita_iva_requires_anchor() {
        // Prefixed form.
        let entities = extract("P.IVA IT12345678901");
        assert_eq!(
            values_of(&entities, &EntityType::PartitaIva),
            vec!["IT12345678901"]
        );

        // Labeled form without the IT prefix.
        let entities = extract("partita iva: 12345678901");
        assert_eq!(
            values_of(&entities, &EntityType::PartitaIva),
            vec!["12345678901"]
        );

        // Bare 11-digit runs must never match.
        let entities = extract("Numero cliente 12345678901");
        assert!(values_of(&entities, &EntityType::PartitaIva).is_empty());
    }

    #[test]
    fn finds_iban_within_length_bounds() {
        let entities = extract("bonifico su IT60X0542811101000000123456");
        assert_eq!(
            values_of(&entities, &EntityType::Iban),
            vec!["IT60X0542811101000000123456"]
        );
        // 14 characters total is below the floor.
        let entities = extract("codice IT60X054281112");
        assert!(values_of(&entities, &EntityType::Iban).is_empty());
    }

    #[test]
    fn telefono_matches_only_the_three_national_shapes() {
        let entities = extract("chiamami al +39 3471234567 oppure allo 02 12345678");
        let phones = values_of(&entities, &EntityType::Telefono);
        assert!(phones.contains(&"+39 3471234567".to_string()));
        assert!(phones.contains(&"02 12345678".to_string()));

        let entities = extract("mobile 3471234567");
        assert_eq!(
            values_of(&entities, &EntityType::Telefono),
            vec!["3471234567"]
        );

        // Arbitrary digit runs are not phone numbers.
        let entities = extract("seriale 9988776655");
        assert!(values_of(&entities, &EntityType::Telefono).is_empty());
    }

    #[test]
    fn finds_dates_with_both_separators() {
        let entities = extract("scadenze: 03/02/2026 e 9-12-2025");
        assert_eq!(
            values_of(&entities, &EntityType::Data),
            vec!["03/02/2026", "9-12-2025"]
        );
        // Month 13 is out of range.
        let entities = extract("riferimento 13/13/2026");
        assert!(values_of(&entities, &EntityType::Data).is_empty());
    }

    #[test]
    fn importo_requires_adjacent_euro_sign() {
        let entities = extract("importo € 1.234,56 oppure 99,50 €");
        let amounts = values_of(&entities, &EntityType::Importo);
        assert!(amounts.contains(&"€ 1.234,56".to_string()));
        assert!(amounts.contains(&"99,50 €".to_string()));

        let entities = extract("totale 1.234,56 senza valuta");
        assert!(values_of(&entities, &EntityType::Importo).is_empty());
    }

    #[test]
    fn finds_numero_pratica_after_label() {
        let entities = extract("riferimento PRAT. 2024/0815 e N. AB-123");
        let refs = values_of(&entities, &EntityType::NumeroPratica);
        assert!(refs.contains(&"2024/0815".to_string()));
        assert!(refs.contains(&"AB-123".to_string()));

        // Labels followed by prose do not produce case numbers.
        let entities = extract("il n. civico della sede");
        assert!(values_of(&entities, &EntityType::NumeroPratica).is_empty());
    }

    #[test]
    fn disabled_types_are_not_emitted() {
        let mut config = PipelineConfig::default();
        config.entity_types_enabled.insert("EMAIL".to_string(), false);
        let entities = RegexEngine::new().extract("scrivi a x@example.com", &config);
        assert!(values_of(&entities, &EntityType::Email).is_empty());
    }

    #[test]
    fn confidence_and_version_come_from_config() {
        let config = PipelineConfig {
            regex_confidence: 0.5,
            regex_rule_version: "regex-v2.3".to_string(),
            ..Default::default()
        };
        let entities = RegexEngine::new().extract("x@example.com", &config);
        assert_eq!(entities[0].confidence, 0.5);
        assert_eq!(entities[0].version, "regex-v2.3");
    }
}
