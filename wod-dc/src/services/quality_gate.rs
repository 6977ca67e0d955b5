//! Quality Gate
//!
//! Final pass before publication. Pure: takes the working catalog and
//! produces a published copy plus an issue list, never mutating its
//! input. Per record it unwraps markdown noise left by earlier fillers,
//! nulls optional text fields that still hold placeholders, recomputes
//! the enrichment flags, strips the process metadata that has no place
//! in published output, and reports records whose critical fields are
//! still missing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

use wod_common::config::KnowledgeConfig;
use wod_common::record::Workout;

use crate::services::classifier::{PlaceholderMatcher, QualityClassifier};

static BOLD_WRAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\*\*|__)(.+?)(?:\*\*|__)$").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*-\s+").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// One record that failed the critical-field check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateIssue {
    pub id: String,
    pub name: Option<String>,
    pub field: String,
}

#[derive(Debug, Default)]
pub struct GateOutcome {
    pub published: Vec<Workout>,
    pub issues: Vec<GateIssue>,
    pub fields_nulled: usize,
    pub fields_unwrapped: usize,
}

pub struct QualityGate {
    config: KnowledgeConfig,
    matcher: PlaceholderMatcher,
    classifier: QualityClassifier,
}

impl QualityGate {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            config: config.clone(),
            matcher: PlaceholderMatcher::new(config),
            classifier: QualityClassifier::new(config),
        }
    }

    /// Strip markdown wrapping a filler left around plain prose: full
    /// bold/underscore wraps, a leading "FieldName:" label, bullet
    /// prefixes, and runs of blank lines.
    pub fn unwrap_markdown(field: &str, text: &str) -> String {
        let mut out = text.trim().to_string();

        if let Some(caps) = BOLD_WRAP_RE.captures(&out) {
            out = caps[1].trim().to_string();
        }

        // "Description: ..." labels echoing the field name back
        let label = format!("{field}:");
        if let Some(prefix) = out.get(..label.len()) {
            if prefix.eq_ignore_ascii_case(&label) {
                out = out[label.len()..].trim_start().to_string();
            }
        }

        out = BULLET_RE.replace_all(&out, "").to_string();
        out = BLANK_RUN_RE.replace_all(&out, "\n\n").to_string();
        out.trim().to_string()
    }

    fn gate_record(&self, workout: &Workout, outcome: &mut GateOutcome) -> Workout {
        let mut published = workout.clone();

        for field in &self.config.optional_text_fields {
            let Some(text) = published.text(field).map(str::to_string) else {
                // Blank optional fields publish as explicit null
                if published.field(field).is_some() {
                    published.set_field(field, Value::Null);
                }
                continue;
            };

            let unwrapped = Self::unwrap_markdown(field, &text);
            if unwrapped.is_empty() || self.matcher.is_placeholder(&unwrapped) {
                published.set_field(field, Value::Null);
                outcome.fields_nulled += 1;
            } else if unwrapped != text {
                published.set_field(field, Value::String(unwrapped));
                outcome.fields_unwrapped += 1;
            }
        }

        // Flags reflect the published values, not the working ones
        self.classifier.reclassify(&mut published, &BTreeSet::new());

        // Revalidation can end only once nothing placeholder-like or
        // unverified remains
        let has_unverified = published.fields.values().any(|v| {
            matches!(v, Value::String(s)
                if s.contains(crate::services::fill_router::UNVERIFIED_SUFFIX.trim()))
        });
        if !has_unverified && !self.matcher.record_has_placeholder(&published) {
            published.needs_revalidation = false;
        }

        // Process metadata stays in the working catalog only
        published.changes.clear();
        published.source = None;
        published.enriched_fields.clear();

        for field in &self.config.critical_fields {
            let ok = published
                .text(field)
                .map(|t| !self.matcher.is_placeholder(t))
                .unwrap_or(false);
            if !ok {
                outcome.issues.push(GateIssue {
                    id: published.id.clone(),
                    name: published.name.clone(),
                    field: field.clone(),
                });
            }
        }

        published
    }

    /// Gate the whole catalog
    pub fn publish(&self, workouts: &[Workout]) -> GateOutcome {
        let mut outcome = GateOutcome::default();
        let published: Vec<Workout> = workouts
            .iter()
            .map(|w| self.gate_record(w, &mut outcome))
            .collect();
        outcome.published = published;

        if !outcome.issues.is_empty() {
            tracing::warn!(
                count = outcome.issues.len(),
                "Records failed the critical-field check"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate() -> QualityGate {
        QualityGate::new(&KnowledgeConfig::default())
    }

    fn complete(id: &str, name: &str) -> Workout {
        let mut w = Workout::new(id);
        w.name = Some(name.into());
        w.set_field("Category", json!("Benchmark (girl/classic)"));
        w.set_field("FormatDuration", json!("For Time"));
        w.set_field("ScoreType", json!("Time"));
        w
    }

    #[test]
    fn test_unwrap_bold_and_label() {
        assert_eq!(
            QualityGate::unwrap_markdown("Description", "**Description: 21-15-9 reps**"),
            "21-15-9 reps"
        );
        assert_eq!(
            QualityGate::unwrap_markdown("CoachNotes", "__Pace the first round.__"),
            "Pace the first round."
        );
    }

    #[test]
    fn test_unwrap_bullets_and_blank_runs() {
        let text = "- Break sets early.\n\n\n\n- Keep transitions tight.";
        assert_eq!(
            QualityGate::unwrap_markdown("CoachNotes", text),
            "Break sets early.\n\nKeep transitions tight."
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "3 rounds: run 400m, 21 kettlebell swings, 12 pull-ups.";
        assert_eq!(QualityGate::unwrap_markdown("Instructions", text), text);
    }

    #[test]
    fn test_placeholder_optional_fields_published_as_null() {
        let g = gate();
        let mut w = complete("1", "Fran");
        w.set_field("Description", json!("[AI generated Description for Fran]"));
        w.set_field("CoachNotes", json!("Go hard."));

        let out = g.publish(&[w]);
        let p = &out.published[0];
        assert_eq!(p.field("Description"), Some(&Value::Null));
        assert_eq!(p.text("CoachNotes"), Some("Go hard."));
        // The nulled field stays flagged for the next enrichment run
        assert!(p.needs_enrichment.contains("Description"));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_process_metadata_stripped_from_published_copy() {
        let g = gate();
        let mut w = complete("1", "Fran");
        w.set_field("Description", json!("Real text"));
        w.record_change("Description", Value::Null, json!("Real text"));
        w.mark_filled("Description", wod_common::record::Provenance::Ai);

        let out = g.publish(&[w.clone()]);
        let p = &out.published[0];
        assert!(p.changes.is_empty());
        assert!(p.enriched_fields.is_empty());
        assert_eq!(p.source, None);
        // Input untouched
        assert!(!w.changes.is_empty());
    }

    #[test]
    fn test_missing_critical_fields_reported() {
        let g = gate();
        let mut w = Workout::new("7");
        w.name = Some("Nameless".into());
        w.set_field("Category", json!("Hero"));
        // FormatDuration and ScoreType missing

        let out = g.publish(&[w]);
        let fields: Vec<&str> = out.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["FormatDuration", "ScoreType"]);
        // Reported but still published
        assert_eq!(out.published.len(), 1);
    }

    #[test]
    fn test_revalidation_cleared_when_clean() {
        let g = gate();
        let mut w = complete("1", "Fran");
        w.set_field("Description", json!("Thrusters and pull-ups, 21-15-9."));
        w.needs_revalidation = true;

        let out = g.publish(&[w]);
        assert!(!out.published[0].needs_revalidation);
    }

    #[test]
    fn test_revalidation_kept_for_unverified_values() {
        let g = gate();
        let mut w = complete("1", "Fran");
        w.set_field("Description", json!("A guess. (AI-SUGGESTED-UNVERIFIED)"));
        w.needs_revalidation = true;

        let out = g.publish(&[w]);
        assert!(out.published[0].needs_revalidation);
    }

    #[test]
    fn test_gate_is_idempotent() {
        let g = gate();
        let mut w = complete("1", "Fran");
        w.set_field("Description", json!("**Description: 21-15-9 reps**"));

        let once = g.publish(&[w]);
        let twice = g.publish(&once.published);
        assert_eq!(once.published, twice.published);
        assert_eq!(twice.fields_unwrapped, 0);
    }
}
