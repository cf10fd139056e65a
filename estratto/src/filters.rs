//! Post-resolution filters and canonical value formatting.
//!
//! Applied in a fixed order after the resolver: empty-guard, blacklist,
//! type flags, canonicalization. Canonicalization rewrites only `value`;
//! the span keeps addressing the original substring of the normalized text.

use chrono::NaiveDate;

use crate::config::PipelineConfig;
use crate::types::{Entity, EntityType};

/// Run every filter in order and return the final entity list.
pub fn apply_all(entities: Vec<Entity>, text_len: usize, config: &PipelineConfig) -> Vec<Entity> {
    let entities = filter_empty_entities(entities, text_len);
    let entities = apply_blacklist(entities, &config.blacklist_values);
    let entities = apply_type_flags(entities, config);
    normalize_canonical_format(entities)
}

/// Final safety net against invalid values; the resolver already enforces
/// this, but the filter chain must hold on any input.
pub fn filter_empty_entities(mut entities: Vec<Entity>, text_len: usize) -> Vec<Entity> {
    entities.retain(|e| e.is_valid(text_len));
    entities
}

/// Drop entities whose value equals a blacklist entry, ignoring case.
pub fn apply_blacklist(mut entities: Vec<Entity>, blacklist: &[String]) -> Vec<Entity> {
    if blacklist.is_empty() {
        return entities;
    }
    let blocked: Vec<String> = blacklist.iter().map(|v| v.to_lowercase()).collect();
    entities.retain(|e| !blocked.contains(&e.value.to_lowercase()));
    entities
}

/// Drop entities whose type is explicitly disabled. Unknown types stay.
pub fn apply_type_flags(mut entities: Vec<Entity>, config: &PipelineConfig) -> Vec<Entity> {
    entities.retain(|e| config.entity_type_enabled(e.entity_type.as_str()));
    entities
}

/// Rewrite values into their canonical shapes:
///
/// - `DATA` → ISO 8601 `YYYY-MM-DD`; values that do not name a real calendar
///   day (e.g. 31/02) are dropped.
/// - `IMPORTO` → dot-decimal with two fraction digits; unparseable amounts
///   are dropped.
/// - `CODICEFISCALE`, `PARTITAIVA` → uppercase, whitespace removed.
/// - everything else passes through unchanged.
pub fn normalize_canonical_format(entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .filter_map(|entity| match &entity.entity_type {
            EntityType::Data => canonical_date(&entity.value).map(|iso| entity.with_value(iso)),
            EntityType::Importo => {
                canonical_amount(&entity.value).map(|amount| entity.with_value(amount))
            }
            EntityType::CodiceFiscale | EntityType::PartitaIva => {
                let cleaned: String = entity
                    .value
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_uppercase();
                Some(entity.with_value(cleaned))
            }
            _ => Some(entity),
        })
        .collect()
}

/// Parse `dd/mm/yyyy` or `dd-mm-yyyy` into ISO 8601.
fn canonical_date(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, ['/', '-']);
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Parse a euro amount (thousands separators, decimal comma or point,
/// optional `€` sign on either side) into `1234.56` form.
fn canonical_amount(value: &str) -> Option<String> {
    let digits_and_seps: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if digits_and_seps.is_empty() || !digits_and_seps.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // The last separator is decimal only when followed by one or two digits;
    // a three-digit tail is a thousands group.
    let decimal_pos = digits_and_seps
        .rfind(['.', ','])
        .filter(|pos| (1..=2).contains(&(digits_and_seps.len() - pos - 1)));

    let (integer_part, fraction_part) = match decimal_pos {
        Some(pos) => (&digits_and_seps[..pos], &digits_and_seps[pos + 1..]),
        None => (digits_and_seps.as_str(), ""),
    };

    let integer: String = integer_part.chars().filter(char::is_ascii_digit).collect();
    let fraction: String = fraction_part.chars().filter(char::is_ascii_digit).collect();
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let integer = if integer.is_empty() { "0" } else { &integer };
    Some(format!("{integer}.{fraction:0<2}"))
}
