//! Targeted Override Applier
//!
//! Hand-written corrections for specific workouts, keyed by name. An
//! override always wins: it overwrites whatever the record currently
//! holds, real value or not, and the fields it writes are exempt from
//! reclassification for the rest of the run. Every application is
//! audited.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use wod_common::config::KnowledgeConfig;
use wod_common::record::Workout;

/// One audited override application
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideAudit {
    pub id: String,
    pub name: String,
    pub field: String,
    pub from: Value,
    pub to: Value,
}

pub struct OverrideApplier {
    /// Lowercased name -> field table
    tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl OverrideApplier {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            tables: config
                .overrides
                .iter()
                .map(|(name, table)| (name.trim().to_lowercase(), table.clone()))
                .collect(),
        }
    }

    /// Apply overrides to one record. Returns the audit entries and adds
    /// every written field to `exempt`.
    pub fn apply(
        &self,
        workout: &mut Workout,
        exempt: &mut BTreeSet<String>,
    ) -> Vec<OverrideAudit> {
        let Some(name) = workout.name.clone() else {
            return Vec::new();
        };
        let Some(table) = self.tables.get(&name.trim().to_lowercase()) else {
            return Vec::new();
        };

        let mut audits = Vec::new();
        for (field, value) in table {
            let from = workout.field_or_null(field);
            let to = Value::String(value.clone());
            if from == to {
                exempt.insert(field.clone());
                continue;
            }
            workout.set_field(field, to.clone());
            workout.record_change(field, from.clone(), to.clone());
            workout.needs_enrichment.remove(field);
            exempt.insert(field.clone());
            audits.push(OverrideAudit {
                id: workout.id.clone(),
                name: name.clone(),
                field: field.clone(),
                from,
                to,
            });
        }

        if !audits.is_empty() {
            tracing::info!(id = %workout.id, name = %name, count = audits.len(),
                "Applied targeted overrides");
        }
        audits
    }

    /// Apply overrides across the catalog, returning all audit entries
    pub fn apply_all(
        &self,
        workouts: &mut [Workout],
        exempt_by_id: &mut BTreeMap<String, BTreeSet<String>>,
    ) -> Vec<OverrideAudit> {
        let mut audits = Vec::new();
        for w in workouts.iter_mut() {
            let exempt = exempt_by_id.entry(w.id.clone()).or_default();
            audits.extend(self.apply(w, exempt));
        }
        audits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn applier() -> OverrideApplier {
        OverrideApplier::new(&KnowledgeConfig::default())
    }

    #[test]
    fn test_override_overwrites_real_values() {
        let a = applier();
        let mut w = Workout::new("1");
        w.name = Some("JT".into());
        w.set_field("DifficultyTier", json!("Beginner"));

        let mut exempt = BTreeSet::new();
        let audits = a.apply(&mut w, &mut exempt);

        assert_eq!(w.text("DifficultyTier"), Some("Advanced"));
        assert!(exempt.contains("DifficultyTier"));
        assert!(audits.iter().any(|a| a.field == "DifficultyTier"
            && a.from == json!("Beginner")
            && a.to == json!("Advanced")));
        assert!(w.changes.contains_key("Instructions_Clean"));
    }

    #[test]
    fn test_override_name_match_is_case_insensitive() {
        let a = applier();
        let mut w = Workout::new("2");
        w.name = Some("  isabel ".into());

        let mut exempt = BTreeSet::new();
        let audits = a.apply(&mut w, &mut exempt);
        assert!(!audits.is_empty());
        assert_eq!(w.text("MovementTypes"), Some("Weightlifting"));
    }

    #[test]
    fn test_already_matching_values_not_audited() {
        let a = applier();
        let mut w = Workout::new("3");
        w.name = Some("Angie".into());

        let mut exempt = BTreeSet::new();
        let first = a.apply(&mut w, &mut exempt);
        assert!(!first.is_empty());

        let mut exempt2 = BTreeSet::new();
        let second = a.apply(&mut w, &mut exempt2);
        assert!(second.is_empty());
        // Fields are still exempt even without new writes
        assert!(exempt2.contains("CoachNotes"));
    }

    #[test]
    fn test_non_override_record_untouched() {
        let a = applier();
        let mut w = Workout::new("4");
        w.name = Some("Fran".into());

        let mut exempt = BTreeSet::new();
        assert!(a.apply(&mut w, &mut exempt).is_empty());
        assert!(exempt.is_empty());
        assert!(w.changes.is_empty());
    }

    #[test]
    fn test_overridden_fields_leave_enrichment_queue() {
        let a = applier();
        let mut w = Workout::new("5");
        w.name = Some("JT".into());
        w.flag_for_enrichment("ScalingOptions");

        let mut exempt = BTreeSet::new();
        a.apply(&mut w, &mut exempt);
        assert!(!w.needs_enrichment.contains("ScalingOptions"));
    }
}
