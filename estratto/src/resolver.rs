//! Candidate fusion: dedup, conflict resolution, deterministic ordering.
//!
//! The resolver takes the merged candidate lists from all engines and
//! produces the canonical entity list. It never mutates its input; survivors
//! are reassembled into a new list. Output ordering is fully deterministic
//! for a given input and configuration.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::config::PipelineConfig;
use crate::types::Entity;

/// Fuse candidates into the canonical entity list.
///
/// 1. Invalid entities (blank value, malformed span) are dropped.
/// 2. Exact duplicates (same `(type, lowercased value, span)`) collapse to
///    one representative, chosen by source priority, then confidence, then
///    first-seen order.
/// 3. Overlapping spans of the *same* type keep the entity from the
///    higher-priority source; on equal source, the higher confidence; then
///    the longer span; then the earlier start. Overlaps across different
///    types are left alone.
/// 4. Survivors are sorted by `(span.start, type tag, source tag)`.
pub fn resolve(candidates: &[Entity], text_len: usize, config: &PipelineConfig) -> Vec<Entity> {
    // Step 1: validity gate. Keep the arrival index: it is the final
    // tie-breaker everywhere below.
    let valid = candidates
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_valid(text_len));

    // Step 2: exact dedup.
    let mut representatives: BTreeMap<(String, String, usize, usize), (usize, &Entity)> =
        BTreeMap::new();
    for (order, entity) in valid {
        let key = (
            entity.entity_type.as_str().to_string(),
            entity.value.to_lowercase(),
            entity.span.start,
            entity.span.end,
        );
        match representatives.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert((order, entity));
            }
            Entry::Occupied(mut slot) => {
                let (kept_order, kept) = *slot.get();
                if strength(entity, order, config) < strength(kept, kept_order, config) {
                    slot.insert((order, entity));
                }
            }
        }
    }

    // Step 3: same-type overlap conflicts. Within each type, walk candidates
    // strongest-first and drop anything overlapping an already-kept span.
    let mut by_type: BTreeMap<&str, Vec<(usize, &Entity)>> = BTreeMap::new();
    for (order, entity) in representatives.into_values() {
        by_type
            .entry(entity.entity_type.as_str())
            .or_default()
            .push((order, entity));
    }

    let mut survivors: Vec<&Entity> = Vec::new();
    for group in by_type.into_values() {
        let mut ranked = group;
        ranked.sort_by(|(a_order, a), (b_order, b)| {
            strength(a, *a_order, config).cmp(&strength(b, *b_order, config))
        });

        let mut kept: Vec<&Entity> = Vec::new();
        for (_, entity) in ranked {
            if !kept.iter().any(|k| k.span.overlaps(entity.span)) {
                kept.push(entity);
            }
        }
        survivors.extend(kept);
    }

    // Step 4: deterministic output order.
    let mut resolved: Vec<Entity> = survivors.into_iter().cloned().collect();
    resolved.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| a.entity_type.as_str().cmp(b.entity_type.as_str()))
            .then_with(|| a.source.as_str().cmp(b.source.as_str()))
            .then_with(|| a.span.end.cmp(&b.span.end))
            .then_with(|| a.value.cmp(&b.value))
    });
    resolved
}

/// Comparable strength key: lower sorts first and wins conflicts.
/// Priority rank, then descending confidence, then descending span length,
/// then earlier start, then arrival order.
fn strength(
    entity: &Entity,
    order: usize,
    config: &PipelineConfig,
) -> (usize, OrderedDescF64, usize, usize, usize) {
    (
        config.source_rank(entity.source),
        OrderedDescF64(entity.confidence),
        usize::MAX - entity.span.len(),
        entity.span.start,
        order,
    )
}

/// Descending total order over confidence values; NaN sorts last.
#[derive(PartialEq)]
struct OrderedDescF64(f64);

impl Eq for OrderedDescF64 {}

impl PartialOrd for OrderedDescF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedDescF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .partial_cmp(&self.0)
            .unwrap_or_else(|| match (self.0.is_nan(), other.0.is_nan()) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ => Ordering::Equal,
            })
    }
}
