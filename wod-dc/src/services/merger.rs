//! Merge / Reconciler
//!
//! Folds an enriched batch back into the base catalog by identity.
//! Enriched records win wholesale: a matching id replaces the base record
//! entirely, including its process metadata. Base ordering is preserved;
//! enriched records whose id does not exist in the base are reported, not
//! inserted, since identity is assigned by the base catalog only.

use std::collections::BTreeMap;

use wod_common::record::Workout;

/// Result of one merge pass
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: Vec<Workout>,
    /// Replacements applied, in base order
    pub replaced_ids: Vec<String>,
    /// Enriched ids with no base counterpart, in enriched order
    pub unknown_ids: Vec<String>,
}

/// Merge an enriched batch into the base catalog
pub fn merge(base: &[Workout], enriched: &[Workout]) -> MergeOutcome {
    let mut by_id: BTreeMap<&str, &Workout> = BTreeMap::new();
    for e in enriched {
        // Last occurrence wins when a batch repeats an id
        by_id.insert(e.id.as_str(), e);
    }

    let mut replaced_ids = Vec::new();
    let merged = base
        .iter()
        .map(|b| match by_id.remove(b.id.as_str()) {
            Some(e) => {
                replaced_ids.push(b.id.clone());
                e.clone()
            }
            None => b.clone(),
        })
        .collect();

    // Whatever is left in the map never matched a base record
    let mut seen = std::collections::BTreeSet::new();
    let unknown_ids: Vec<String> = enriched
        .iter()
        .filter(|e| by_id.contains_key(e.id.as_str()) && seen.insert(e.id.clone()))
        .map(|e| e.id.clone())
        .collect();

    for id in &unknown_ids {
        tracing::warn!(id = %id, "Enriched record has no base counterpart, skipped");
    }

    MergeOutcome {
        merged,
        replaced_ids,
        unknown_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workout(id: &str, name: &str, desc: &str) -> Workout {
        let mut w = Workout::new(id);
        w.name = Some(name.into());
        w.set_field("Description", json!(desc));
        w
    }

    #[test]
    fn test_enriched_record_replaces_base_wholesale() {
        let base = vec![workout("1", "Fran", "old"), workout("2", "Grace", "old")];
        let mut enriched = workout("2", "Grace", "new");
        enriched.flag_for_enrichment("CoachNotes");

        let out = merge(&base, &[enriched]);
        assert_eq!(out.merged.len(), 2);
        assert_eq!(out.merged[1].text("Description"), Some("new"));
        assert!(out.merged[1].needs_enrichment.contains("CoachNotes"));
        assert_eq!(out.replaced_ids, vec!["2"]);
        assert!(out.unknown_ids.is_empty());
    }

    #[test]
    fn test_base_order_preserved() {
        let base = vec![
            workout("3", "Helen", "h"),
            workout("1", "Fran", "f"),
            workout("2", "Grace", "g"),
        ];
        let enriched = vec![workout("2", "Grace", "g2"), workout("3", "Helen", "h2")];

        let out = merge(&base, &enriched);
        let ids: Vec<&str> = out.merged.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_unknown_ids_reported_not_inserted() {
        let base = vec![workout("12", "Fran", "f")];
        let enriched = vec![workout("99", "Ghost", "g"), workout("12", "Fran", "f2")];

        let out = merge(&base, &enriched);
        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.merged[0].text("Description"), Some("f2"));
        assert_eq!(out.unknown_ids, vec!["99"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = vec![workout("1", "Fran", "old"), workout("2", "Grace", "g")];
        let enriched = vec![workout("1", "Fran", "new")];

        let once = merge(&base, &enriched);
        let twice = merge(&once.merged, &enriched);
        assert_eq!(once.merged, twice.merged);
    }

    #[test]
    fn test_sequential_batches_compose() {
        let base = vec![workout("1", "Fran", "v0"), workout("2", "Grace", "v0")];
        let batch_a = vec![workout("1", "Fran", "v1")];
        let batch_b = vec![workout("2", "Grace", "v1")];

        let ab = merge(&merge(&base, &batch_a).merged, &batch_b);
        let ba = merge(&merge(&base, &batch_b).merged, &batch_a);
        assert_eq!(ab.merged, ba.merged);
    }

    #[test]
    fn test_repeated_id_in_batch_last_wins() {
        let base = vec![workout("1", "Fran", "v0")];
        let enriched = vec![workout("1", "Fran", "first"), workout("1", "Fran", "second")];

        let out = merge(&base, &enriched);
        assert_eq!(out.merged[0].text("Description"), Some("second"));
        assert!(out.unknown_ids.is_empty());
    }
}
