//! Pipeline orchestration
//!
//! Phases in fixed order: clean (offline, deterministic), enrich (the
//! filler chain), merge, publish (gate, then targeted overrides). Each
//! phase leaves the catalog in a state the next phase can consume, and a
//! failure on one record never aborts the run.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use wod_common::config::{KnowledgeConfig, RunLimits};
use wod_common::record::Workout;

use crate::services::fill_router::{DatasetPatterns, FillRouter};
use crate::services::report::{AuditEntry, RunReport};
use crate::services::{merge, Normalizer, OverrideApplier, QualityClassifier, QualityGate};

pub struct Pipeline {
    classifier: QualityClassifier,
    normalizer: Normalizer,
    gate: QualityGate,
    overrides: OverrideApplier,
    timestamp: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(config: &KnowledgeConfig, limits: &RunLimits) -> Self {
        Self {
            classifier: QualityClassifier::new(config),
            normalizer: Normalizer::new(config, limits.weight_precision_kg),
            gate: QualityGate::new(config),
            overrides: OverrideApplier::new(config),
            timestamp: Utc::now(),
        }
    }

    /// Fixed timestamp, for reproducible output in tests
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Offline cleaning: scrub leaked markup, normalize every text field,
    /// and classify what still needs a value.
    pub fn clean(&self, workouts: &mut [Workout], report: &mut RunReport) {
        tracing::info!(rows = workouts.len(), "Cleaning catalog");

        for workout in workouts.iter_mut() {
            if self.classifier.scrub_svg_garbage(workout) {
                report.svg_scrubbed += 1;
            }
            report.normalized_fields += self.normalizer.apply(workout);
            report.contradiction_fields += self
                .classifier
                .contradictions(workout, &BTreeSet::new())
                .len();
            self.classifier.reclassify(workout, &BTreeSet::new());
            if !workout.needs_enrichment.is_empty() {
                report.flagged_for_enrichment += 1;
            }
            workout.last_cleaned = Some(self.timestamp);
            report.rows_processed += 1;
        }

        tracing::info!(
            flagged = report.flagged_for_enrichment,
            normalized = report.normalized_fields,
            "Cleaning pass done"
        );
    }

    /// Run the filler chain over every flagged record. Patterns are
    /// learned from the catalog as it stands before any fill.
    pub async fn enrich(
        &self,
        workouts: &mut [Workout],
        router: &mut FillRouter,
        report: &mut RunReport,
    ) {
        let patterns = DatasetPatterns::learn(workouts, &self.classifier);

        let flagged = workouts
            .iter()
            .filter(|w| !w.needs_enrichment.is_empty())
            .count();
        tracing::info!(rows = workouts.len(), flagged, "Enriching catalog");

        for workout in workouts.iter_mut() {
            self.classifier.reclassify(workout, &BTreeSet::new());
            if workout.needs_enrichment.is_empty() {
                continue;
            }
            router.fill_record(workout, &patterns).await;
            self.classifier.reclassify(workout, &BTreeSet::new());
            workout.last_cleaned = Some(self.timestamp);
        }

        report.absorb_router(router.stats());
        for workout in workouts.iter() {
            for (field, change) in &workout.changes {
                if workout.enriched_fields.contains(field) {
                    report.audit.push(AuditEntry {
                        id: workout.id.clone(),
                        name: workout.name.clone(),
                        field: field.clone(),
                        from: change.from.clone(),
                        to: change.to.clone(),
                        source: workout
                            .source
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_else(|| "fill".to_string()),
                        citation: router
                            .citations()
                            .get(&(workout.id.clone(), field.clone()))
                            .cloned(),
                    });
                }
            }
        }
    }

    /// Fold an enriched batch into the base catalog
    pub fn merge_batch(
        &self,
        base: &[Workout],
        enriched: &[Workout],
        report: &mut RunReport,
    ) -> Vec<Workout> {
        let outcome = merge(base, enriched);
        report.merge_replaced = outcome.replaced_ids.len();
        report.merge_unknown_ids = outcome.unknown_ids;
        outcome.merged
    }

    /// Publication: gate every record, then apply the targeted overrides
    /// on the published copies. Overridden fields are exempt from the
    /// final reclassification.
    pub fn publish(&self, workouts: &[Workout], report: &mut RunReport) -> Vec<Workout> {
        tracing::info!(rows = workouts.len(), "Publishing catalog");

        let mut outcome = self.gate.publish(workouts);
        report.gate_fields_nulled = outcome.fields_nulled;
        report.gate_fields_unwrapped = outcome.fields_unwrapped;
        report.record_gate_issues(&outcome.issues);

        let mut exempt_by_id: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let audits = self
            .overrides
            .apply_all(&mut outcome.published, &mut exempt_by_id);
        for audit in &audits {
            report.audit.push(AuditEntry::from_override(audit));
        }

        for workout in outcome.published.iter_mut() {
            let exempt = exempt_by_id.remove(&workout.id).unwrap_or_default();
            self.classifier.reclassify(workout, &exempt);
            // Overrides audit through the report, not the published file
            workout.changes.clear();
            workout.source = None;
            workout.enriched_fields.clear();
        }

        outcome.published
    }
}
