//! Workout record model
//!
//! One record per workout: a stable `id`, a typed `Name` (dedup and manual
//! overrides key on it), an open extension map for every other attribute,
//! and the process metadata the pipeline maintains across stages
//! (`needsEnrichment`, `needsRevalidation`, `source`, `changes`).
//!
//! JSON field names match the catalog files produced by earlier tooling,
//! so records round-trip byte-compatibly through `serde_json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Provenance tag recording which filler supplied a field's current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Archetype template text
    Template,
    /// AI assistant structured response
    Ai,
    /// Web search snippet (citation-only trust class)
    Web,
    /// Dataset pattern or curated benchmark table
    Dataset,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Template => "template",
            Provenance::Ai => "ai",
            Provenance::Web => "web",
            Provenance::Dataset => "dataset",
        }
    }
}

/// Audit entry for one field mutation: value before and after
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// Accept either a JSON string or number for `id` and normalize to String.
///
/// Source tables carry both forms; identity comparison is always textual.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be string or number, got {other}"
        ))),
    }
}

/// One workout record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    /// Stable identity, assigned once, never reused
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// Display name (typed: record identity for dedup and overrides)
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    /// Open extension map: every other attribute keyed by field name
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,

    /// Field names still needing a value (null or recognized placeholder)
    #[serde(rename = "needsEnrichment", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub needs_enrichment: BTreeSet<String>,

    /// A prior fill is unverified and must be re-checked
    #[serde(rename = "needsRevalidation", default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_revalidation: bool,

    /// Which filler supplied the most recent values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Provenance>,

    /// Audit trail: field name -> {from, to}; grows monotonically in a run
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub changes: BTreeMap<String, FieldChange>,

    /// Fields a filler has written this run
    #[serde(rename = "enrichedFields", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub enriched_fields: BTreeSet<String>,

    /// Timestamp of the last cleaning pass, stored as RFC 3339
    #[serde(rename = "lastCleaned", default, skip_serializing_if = "Option::is_none")]
    pub last_cleaned: Option<DateTime<Utc>>,
}

impl Workout {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            fields: BTreeMap::new(),
            needs_enrichment: BTreeSet::new(),
            needs_revalidation: false,
            source: None,
            changes: BTreeMap::new(),
            enriched_fields: BTreeSet::new(),
            last_cleaned: None,
        }
    }

    /// Read an extension-map field by name. `Name` is typed; use `text`
    /// or `field_or_null` for accessors that cover it too.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read a field as text, trimmed. Empty strings read as None.
    pub fn text(&self, name: &str) -> Option<&str> {
        if name == "Name" {
            return self.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
        }
        match self.fields.get(name) {
            Some(Value::String(s)) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            }
            _ => None,
        }
    }

    /// Write a field by name. `Name` routes to the typed field.
    pub fn set_field(&mut self, name: &str, value: Value) {
        if name == "Name" {
            self.name = match value {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            };
            return;
        }
        self.fields.insert(name.to_string(), value);
    }

    /// Current value of a field for audit purposes (null when absent)
    pub fn field_or_null(&self, name: &str) -> Value {
        if name == "Name" {
            return self
                .name
                .as_ref()
                .map(|s| Value::String(s.clone()))
                .unwrap_or(Value::Null);
        }
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Record a {from, to} audit pair. No-op when the value did not change.
    pub fn record_change(&mut self, field: &str, from: Value, to: Value) {
        if from == to {
            return;
        }
        self.changes
            .insert(field.to_string(), FieldChange { from, to });
    }

    /// Mark a field as still needing a value
    pub fn flag_for_enrichment(&mut self, field: &str) {
        self.needs_enrichment.insert(field.to_string());
    }

    /// A filler wrote a real value: clear the flag and track the fill
    pub fn mark_filled(&mut self, field: &str, source: Provenance) {
        self.needs_enrichment.remove(field);
        self.enriched_fields.insert(field.to_string());
        self.source = Some(source);
    }
}

/// True when a value carries no information: null, blank text, empty
/// list/object.
pub fn value_is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_accepts_string_or_number() {
        let a: Workout = serde_json::from_value(json!({"id": "7", "Name": "Fran"})).unwrap();
        let b: Workout = serde_json::from_value(json!({"id": 7, "Name": "Fran"})).unwrap();
        assert_eq!(a.id, "7");
        assert_eq!(b.id, "7");
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let input = json!({
            "id": "w1",
            "Name": "Cindy",
            "Category": "Benchmark (girl/classic)",
            "FormatDuration": "AMRAP 20",
            "needsEnrichment": ["Description"],
            "needsRevalidation": true
        });
        let w: Workout = serde_json::from_value(input).unwrap();
        assert_eq!(w.text("Category"), Some("Benchmark (girl/classic)"));
        assert!(w.needs_enrichment.contains("Description"));
        assert!(w.needs_revalidation);

        let out = serde_json::to_value(&w).unwrap();
        assert_eq!(out["FormatDuration"], "AMRAP 20");
        assert_eq!(out["needsEnrichment"], json!(["Description"]));
    }

    #[test]
    fn test_internal_fields_skipped_when_empty() {
        let w = Workout::new("w2");
        let out = serde_json::to_value(&w).unwrap();
        assert!(out.get("needsEnrichment").is_none());
        assert!(out.get("needsRevalidation").is_none());
        assert!(out.get("changes").is_none());
        assert!(out.get("source").is_none());
    }

    #[test]
    fn test_last_cleaned_round_trips_as_rfc3339() {
        let mut w = Workout::new("w6");
        w.last_cleaned = Some("2026-08-27T00:00:00Z".parse().unwrap());
        let out = serde_json::to_value(&w).unwrap();
        assert_eq!(out["lastCleaned"], "2026-08-27T00:00:00Z");
        let back: Workout = serde_json::from_value(out).unwrap();
        assert_eq!(back.last_cleaned, w.last_cleaned);
    }

    #[test]
    fn test_record_change_skips_no_op() {
        let mut w = Workout::new("w3");
        w.record_change("Description", json!("same"), json!("same"));
        assert!(w.changes.is_empty());
        w.record_change("Description", json!("old"), json!("new"));
        assert_eq!(w.changes["Description"].to, json!("new"));
    }

    #[test]
    fn test_name_routes_through_set_field() {
        let mut w = Workout::new("w4");
        w.set_field("Name", json!("Helen"));
        assert_eq!(w.name.as_deref(), Some("Helen"));
        assert_eq!(w.text("Name"), Some("Helen"));
        assert_eq!(w.field_or_null("Name"), json!("Helen"));
    }

    #[test]
    fn test_mark_filled_clears_flag() {
        let mut w = Workout::new("w5");
        w.flag_for_enrichment("Description");
        w.mark_filled("Description", Provenance::Dataset);
        assert!(w.needs_enrichment.is_empty());
        assert!(w.enriched_fields.contains("Description"));
        assert_eq!(w.source, Some(Provenance::Dataset));
    }

    #[test]
    fn test_value_is_blank() {
        assert!(value_is_blank(&Value::Null));
        assert!(value_is_blank(&json!("   ")));
        assert!(value_is_blank(&json!([])));
        assert!(!value_is_blank(&json!("For Time")));
        assert!(!value_is_blank(&json!(0)));
    }
}
