//! Field Normalizer
//!
//! Pure text rewriting into canonical form: weight conversion to kg,
//! time-format standardization, workout-format vocabulary, and movement
//! name canonicalization through the synonym table. Never fails; input
//! that matches nothing passes through unchanged. Idempotent: normalized
//! output no longer matches the raw patterns, so a second pass is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use wod_common::config::KnowledgeConfig;
use wod_common::record::Workout;

const LBS_TO_KG: f64 = 0.453592;

static PAIRED_LBS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\s*(?:lbs?|pounds?)\b").unwrap()
});
static SINGLE_LBS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:lbs?|pounds?)\b").unwrap());
static MINUTES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:minutes?|mins?)\b").unwrap());
static COLON_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+):(\d{2})\b").unwrap());
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static ROUNDS_FOR_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*rounds?\b.*\bfor\s*time\b").unwrap());
static AMRAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bamrap\b\D*(\d+)?").unwrap());
static EMOM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bemom\b\D*(\d+)?").unwrap());
static TABATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btabata\b").unwrap());
static FOR_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfor\s*time\b").unwrap());

/// Fields the movement synonym table applies to
const MOVEMENT_TEXT_FIELDS: &[&str] = &[
    "Instructions",
    "Instructions_Clean",
    "MovementTypes",
    "EquipmentNeeded",
];

pub struct Normalizer {
    /// Weight rounding precision in kg
    precision: f64,
    /// Single alternation over every synonym variant, longest first
    variant_re: Option<Regex>,
    /// Lowercased variant -> canonical label
    variant_map: std::collections::BTreeMap<String, String>,
}

impl Normalizer {
    pub fn new(config: &KnowledgeConfig, precision_kg: f64) -> Self {
        let mut variant_map = std::collections::BTreeMap::new();
        let mut variants: Vec<String> = Vec::new();
        for (canonical, spellings) in &config.movement_synonyms {
            for v in spellings {
                variant_map.insert(v.to_lowercase(), canonical.clone());
                variants.push(regex::escape(v));
            }
            // Canonical label maps to itself so a second pass is stable
            variant_map.insert(canonical.to_lowercase(), canonical.clone());
            variants.push(regex::escape(canonical));
        }
        // Longest alternative first, otherwise "pull up" wins over "pull ups"
        variants.sort_by_key(|v| std::cmp::Reverse(v.len()));
        let variant_re = if variants.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b(?:{})\b", variants.join("|"))).ok()
        };

        Self {
            precision: precision_kg,
            variant_re,
            variant_map,
        }
    }

    fn round_to_precision(&self, val: f64) -> f64 {
        (val / self.precision).round() * self.precision
    }

    fn format_kg(val: f64) -> String {
        if (val - val.round()).abs() < 1e-9 {
            format!("{}", val.round() as i64)
        } else {
            format!("{val:.1}")
        }
    }

    /// Convert lb/lbs/pounds loads to kgs, paired loads first
    /// (`135/95 lbs` -> `61.5/43 kgs`).
    pub fn convert_weights(&self, value: &str) -> String {
        let paired = PAIRED_LBS_RE.replace_all(value, |caps: &regex::Captures<'_>| {
            let lb1: f64 = caps[1].parse().unwrap_or(0.0);
            let lb2: f64 = caps[2].parse().unwrap_or(0.0);
            format!(
                "{}/{} kgs",
                Self::format_kg(self.round_to_precision(lb1 * LBS_TO_KG)),
                Self::format_kg(self.round_to_precision(lb2 * LBS_TO_KG))
            )
        });
        SINGLE_LBS_RE
            .replace_all(&paired, |caps: &regex::Captures<'_>| {
                let lb: f64 = caps[1].parse().unwrap_or(0.0);
                format!(
                    "{} kgs",
                    Self::format_kg(self.round_to_precision(lb * LBS_TO_KG))
                )
            })
            .into_owned()
    }

    /// Standardize time formats (`10 minutes` -> `10m 0s`, `3:45` -> `3m 45s`)
    pub fn standardize_times(&self, value: &str) -> String {
        let mins = MINUTES_RE.replace_all(value, |caps: &regex::Captures<'_>| {
            format!("{}m 0s", &caps[1])
        });
        COLON_TIME_RE
            .replace_all(&mins, |caps: &regex::Captures<'_>| {
                let m: u32 = caps[1].parse().unwrap_or(0);
                let s: u32 = caps[2].parse().unwrap_or(0);
                format!("{m}m {s}s")
            })
            .into_owned()
    }

    /// Map a raw format string onto the canonical vocabulary. Unmatched
    /// input passes through unchanged.
    pub fn canonicalize_format(&self, value: &str) -> String {
        let trimmed = value.trim();
        if let Some(caps) = ROUNDS_FOR_TIME_RE.captures(trimmed) {
            return format!("{} Rounds For Time", &caps[1]);
        }
        if let Some(caps) = AMRAP_RE.captures(trimmed) {
            if let Some(n) = caps.get(1) {
                return format!("AMRAP {}", n.as_str());
            }
            return "AMRAP".to_string();
        }
        if let Some(caps) = EMOM_RE.captures(trimmed) {
            if let Some(n) = caps.get(1) {
                return format!("EMOM {}", n.as_str());
            }
            return "EMOM".to_string();
        }
        if TABATA_RE.is_match(trimmed) {
            return "Tabata".to_string();
        }
        if FOR_TIME_RE.is_match(trimmed) {
            return "For Time".to_string();
        }
        trimmed.to_string()
    }

    /// Replace every synonym spelling with its canonical movement label
    pub fn canonicalize_movements(&self, value: &str) -> String {
        let Some(re) = &self.variant_re else {
            return value.to_string();
        };
        re.replace_all(value, |caps: &regex::Captures<'_>| {
            let hit = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            self.variant_map
                .get(&hit.to_lowercase())
                .cloned()
                .unwrap_or_else(|| hit.to_string())
        })
        .into_owned()
    }

    /// Trim and collapse internal whitespace runs to single spaces,
    /// preserving line breaks.
    pub fn collapse_whitespace(&self, value: &str) -> String {
        value
            .lines()
            .map(|line| MULTI_SPACE_RE.replace_all(line.trim(), " ").into_owned())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Full text normalization for one field value
    fn normalize_text(&self, value: &str, field: &str) -> String {
        let mut out = self.collapse_whitespace(value);
        out = self.convert_weights(&out);
        out = self.standardize_times(&out);
        if field == "FormatDuration" {
            out = self.canonicalize_format(&out);
        }
        if MOVEMENT_TEXT_FIELDS.contains(&field) {
            out = self.canonicalize_movements(&out);
        }
        out
    }

    /// Normalize every text field of a record in place, recording each
    /// rewrite in the audit trail. Returns the number of fields changed.
    pub fn apply(&self, workout: &mut Workout) -> usize {
        let mut changed = 0;

        let field_names: Vec<String> = workout.fields.keys().cloned().collect();
        for field in field_names {
            let Some(Value::String(current)) = workout.fields.get(&field) else {
                continue;
            };
            let next = self.normalize_text(current, &field);
            if next != *current {
                let old = Value::String(current.clone());
                workout.fields.insert(field.clone(), Value::String(next.clone()));
                workout.record_change(&field, old, Value::String(next));
                changed += 1;
            }
        }

        if let Some(name) = workout.name.clone() {
            let next = self.collapse_whitespace(&name);
            if next != name {
                workout.name = Some(next.clone());
                workout.record_change("Name", Value::String(name), Value::String(next));
                changed += 1;
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        Normalizer::new(&KnowledgeConfig::default(), 0.5)
    }

    #[test]
    fn test_single_weight_conversion() {
        let n = normalizer();
        assert_eq!(n.convert_weights("95 lbs barbell"), "43 kgs barbell");
        assert_eq!(n.convert_weights("20lb vest"), "9 kgs vest");
        assert_eq!(n.convert_weights("135 pounds"), "61 kgs");
    }

    #[test]
    fn test_paired_weight_conversion() {
        let n = normalizer();
        assert_eq!(n.convert_weights("135/95 lbs"), "61/43 kgs");
        assert_eq!(n.convert_weights("Barbell (95/65lbs)"), "Barbell (43/29.5 kgs)");
    }

    #[test]
    fn test_weight_precision_settings() {
        let cfg = KnowledgeConfig::default();
        let coarse = Normalizer::new(&cfg, 2.5);
        // 95 lb = 43.09 kg -> nearest 2.5 is 42.5
        assert_eq!(coarse.convert_weights("95 lbs"), "42.5 kgs");
        let five = Normalizer::new(&cfg, 5.0);
        assert_eq!(five.convert_weights("95 lbs"), "45 kgs");
    }

    #[test]
    fn test_weight_conversion_idempotent() {
        let n = normalizer();
        let once = n.convert_weights("135/95 lbs and 53 lb kettlebell");
        let twice = n.convert_weights(&once);
        assert_eq!(once, twice);
        assert!(!once.to_lowercase().contains("lb"));
    }

    #[test]
    fn test_time_standardization() {
        let n = normalizer();
        assert_eq!(n.standardize_times("cap at 10 minutes"), "cap at 10m 0s");
        assert_eq!(n.standardize_times("best time 3:45"), "best time 3m 45s");
        let once = n.standardize_times("20 min AMRAP, record 7:30");
        assert_eq!(once, n.standardize_times(&once));
    }

    #[test]
    fn test_format_canonicalization() {
        let n = normalizer();
        assert_eq!(n.canonicalize_format("for time"), "For Time");
        assert_eq!(n.canonicalize_format("AMRAP in 20 min"), "AMRAP 20");
        assert_eq!(n.canonicalize_format("emom 12"), "EMOM 12");
        assert_eq!(n.canonicalize_format("5 rounds for time"), "5 Rounds For Time");
        assert_eq!(n.canonicalize_format("tabata something"), "Tabata");
        // Unmatched input passes through
        assert_eq!(n.canonicalize_format("Chipper"), "Chipper");
    }

    #[test]
    fn test_format_canonicalization_idempotent() {
        let n = normalizer();
        for raw in ["for time", "amrap 20", "EMOM 16", "3 rounds for time", "Tabata"] {
            let once = n.canonicalize_format(raw);
            assert_eq!(once, n.canonicalize_format(&once), "input {raw}");
        }
    }

    #[test]
    fn test_movement_synonyms() {
        let n = normalizer();
        assert_eq!(
            n.canonicalize_movements("100 pullups, 100 push ups"),
            "100 Pull-Up, 100 Push-Up"
        );
        assert_eq!(n.canonicalize_movements("kb swings and wall-ball shots"), "Kettlebell Swing and Wall Ball");
        // Canonical labels are stable
        let once = n.canonicalize_movements("Pull-Up then Thruster");
        assert_eq!(once, n.canonicalize_movements(&once));
    }

    #[test]
    fn test_unmatched_text_passes_through() {
        let n = normalizer();
        assert_eq!(n.convert_weights("bodyweight only"), "bodyweight only");
        assert_eq!(n.canonicalize_movements("rest day"), "rest day");
    }

    #[test]
    fn test_apply_records_changes() {
        let n = normalizer();
        let mut w = Workout::new("w1");
        w.set_field("EquipmentNeeded", json!("95 lbs barbell"));
        w.set_field("FormatDuration", json!("for time"));
        w.set_field("Description", json!("already clean"));

        let changed = n.apply(&mut w);
        assert_eq!(changed, 2);
        assert_eq!(w.text("EquipmentNeeded"), Some("43 kgs barbell"));
        assert_eq!(w.text("FormatDuration"), Some("For Time"));
        assert!(w.changes.contains_key("EquipmentNeeded"));
        assert!(!w.changes.contains_key("Description"));

        // Second pass is a no-op
        assert_eq!(n.apply(&mut w), 0);
    }
}
