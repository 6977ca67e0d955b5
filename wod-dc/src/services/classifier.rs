//! Quality Classifier
//!
//! Decides which fields of a record are missing or of unacceptable
//! quality: null/empty values, recognized placeholder text, legacy
//! generic defaults, explicit UNKNOWN markers, and cross-field
//! contradictions. Output is a deterministic, order-independent set of
//! field names. Re-run after every mutating stage so `needsEnrichment`
//! stays accurate; fields written by a manual override are exempt for the
//! rest of the run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use wod_common::config::KnowledgeConfig;
use wod_common::record::{value_is_blank, Workout};

/// Fields the classifier watches for content quality
const WATCH_FIELDS: &[&str] = &[
    "Description",
    "CoachNotes",
    "Flavor_Text",
    "Instructions",
    "Instructions_Clean",
    "MovementTypes",
    "DifficultyTier",
    "ScalingOptions",
    "EquipmentNeeded",
    "FormatDuration",
    "ScoreType",
    "Category",
];

static NUMERIC_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());
static KG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*kgs?\b").unwrap());
static LB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:lbs?|pounds?)\b").unwrap());

/// SVG path data that leaked into instruction text during scraping
static SVG_GARBAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)171-192-51-51 357-357h576v-72h240v240h-72").unwrap());

/// Shared placeholder matcher built from the knowledge tables
pub struct PlaceholderMatcher {
    phrases: Vec<String>,
    patterns: Vec<Regex>,
}

impl PlaceholderMatcher {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            phrases: config
                .placeholder_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            patterns: config
                .placeholder_patterns
                .iter()
                .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
                .collect(),
        }
    }

    /// True when the text contains any placeholder phrase or pattern
    pub fn is_placeholder(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.phrases.iter().any(|p| lower.contains(p.as_str()))
            || self.patterns.iter().any(|re| re.is_match(text))
    }

    /// True when any watched field of the record still holds a placeholder
    pub fn record_has_placeholder(&self, workout: &Workout) -> bool {
        WATCH_FIELDS.iter().any(|field| {
            workout
                .text(field)
                .map(|t| self.is_placeholder(t))
                .unwrap_or(false)
        })
    }
}

pub struct QualityClassifier {
    matcher: PlaceholderMatcher,
    config: KnowledgeConfig,
}

impl QualityClassifier {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            matcher: PlaceholderMatcher::new(config),
            config: config.clone(),
        }
    }

    pub fn matcher(&self) -> &PlaceholderMatcher {
        &self.matcher
    }

    /// Explicit UNKNOWN marker: bare "unknown", or "unknown" paired with
    /// "review"
    fn has_unknown_marker(text: &str) -> bool {
        let low = text.to_lowercase();
        let low = low.trim();
        low == "unknown" || (low.contains("unknown") && low.contains("review"))
    }

    /// A value exactly matching a legacy generic default carries no data
    fn is_legacy_default(&self, field: &str, text: &str) -> bool {
        self.config
            .legacy_defaults
            .get(field)
            .map(|defaults| {
                defaults
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(text.trim()))
            })
            .unwrap_or(false)
    }

    /// The full low-quality text check: placeholder, explicit UNKNOWN
    /// marker, or legacy generic default. Anything this returns true for
    /// is fair game for a filler to overwrite.
    pub fn is_low_quality(&self, field: &str, text: &str) -> bool {
        self.matcher.is_placeholder(text)
            || Self::has_unknown_marker(text)
            || self.is_legacy_default(field, text)
    }

    /// Classify one record. `exempt` holds fields a manual override wrote
    /// this run; those are trusted and never re-flagged.
    pub fn classify(&self, workout: &Workout, exempt: &BTreeSet<String>) -> BTreeSet<String> {
        let mut needs = BTreeSet::new();

        for field in WATCH_FIELDS {
            if exempt.contains(*field) {
                continue;
            }
            match workout.text(field) {
                None => {
                    // Null, absent, or blank after trimming
                    let missing = workout.field(field).map(value_is_blank).unwrap_or(true);
                    if missing {
                        needs.insert(field.to_string());
                    }
                }
                Some(text) => {
                    if self.is_low_quality(field, text) {
                        needs.insert(field.to_string());
                    }
                }
            }
        }

        self.detect_contradictions(workout, exempt, &mut needs);
        needs
    }

    /// Cross-field contradictions flag the field most likely wrong
    fn detect_contradictions(
        &self,
        workout: &Workout,
        exempt: &BTreeSet<String>,
        needs: &mut BTreeSet<String>,
    ) {
        // "For Time" with no numeric rep/distance token in instructions
        if !exempt.contains("Instructions") {
            let format_is_timed = workout
                .text("FormatDuration")
                .map(|f| f.to_lowercase().contains("for time"))
                .unwrap_or(false);
            if format_is_timed {
                if let Some(instr) = workout.text("Instructions") {
                    if !NUMERIC_TOKEN_RE.is_match(instr) {
                        needs.insert("Instructions".to_string());
                    }
                }
            }
        }

        // Benchmark workouts are not Beginner-tier
        if !exempt.contains("DifficultyTier") {
            let is_benchmark = workout
                .text("Category")
                .map(|c| c.to_lowercase().contains("benchmark"))
                .unwrap_or(false);
            let tier = workout
                .text("DifficultyTier")
                .or_else(|| workout.text("Level"));
            if is_benchmark && tier.map(|t| t.eq_ignore_ascii_case("beginner")).unwrap_or(false) {
                needs.insert("DifficultyTier".to_string());
            }
        }

        // Equipment text mixing both unit systems
        if !exempt.contains("EquipmentNeeded") {
            if let Some(equipment) = workout.text("EquipmentNeeded") {
                if KG_RE.is_match(equipment) && LB_RE.is_match(equipment) {
                    needs.insert("EquipmentNeeded".to_string());
                }
            }
        }
    }

    /// Contradiction-flagged fields only, for reporting
    pub fn contradictions(&self, workout: &Workout, exempt: &BTreeSet<String>) -> BTreeSet<String> {
        let mut needs = BTreeSet::new();
        self.detect_contradictions(workout, exempt, &mut needs);
        needs
    }

    /// Null out instruction fields that contain leaked SVG path data and
    /// flag them for enrichment. Returns true when the record changed.
    pub fn scrub_svg_garbage(&self, workout: &mut Workout) -> bool {
        let hit = workout
            .text("Instructions")
            .map(|t| SVG_GARBAGE_RE.is_match(t))
            .unwrap_or(false);
        if !hit {
            return false;
        }
        for field in ["Instructions", "Instructions_Clean"] {
            let old = workout.field_or_null(field);
            workout.set_field(field, Value::Null);
            workout.record_change(field, old, Value::Null);
            workout.flag_for_enrichment(field);
        }
        tracing::debug!(id = %workout.id, "Scrubbed SVG garbage from instructions");
        true
    }

    /// Recompute `needsEnrichment` on the record in place
    pub fn reclassify(&self, workout: &mut Workout, exempt: &BTreeSet<String>) {
        workout.needs_enrichment = self.classify(workout, exempt);
    }
}
