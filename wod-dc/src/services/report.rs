//! Run report
//!
//! One report per pipeline run: counters for every stage plus the
//! field-level audit trail, rendered as markdown for humans and kept as
//! JSON next to the output files for tooling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::dedup::DedupReport;
use crate::services::fill_router::RouterStats;
use crate::services::library_pruner::PruneOutcome;
use crate::services::overrides::OverrideAudit;
use crate::services::quality_gate::GateIssue;

/// One audited field mutation, flattened for the report artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub field: String,
    pub from: Value,
    pub to: Value,
    /// Which stage wrote the value: normalizer, a filler, or an override
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

impl AuditEntry {
    pub fn from_override(audit: &OverrideAudit) -> Self {
        Self {
            id: audit.id.clone(),
            name: Some(audit.name.clone()),
            field: audit.field.clone(),
            from: audit.from.clone(),
            to: audit.to.clone(),
            source: "override".to_string(),
            citation: None,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub ids_assigned: usize,
    pub normalized_fields: usize,
    pub contradiction_fields: usize,
    pub svg_scrubbed: usize,
    pub flagged_for_enrichment: usize,
    pub needs_manual_review: usize,

    pub dataset_fills: usize,
    pub template_fills: usize,
    pub ai_fills: usize,
    pub web_citations: usize,
    pub unverified_fills: usize,
    pub ai_calls: usize,
    pub web_calls: usize,
    pub cache_hits: usize,
    pub budget_exhausted_fields: usize,
    pub failed_calls: usize,

    pub merge_replaced: usize,
    pub merge_unknown_ids: Vec<String>,

    pub gate_fields_nulled: usize,
    pub gate_fields_unwrapped: usize,
    pub gate_issue_count: usize,

    pub exact_duplicate_groups: usize,
    pub near_duplicates: usize,

    pub movements_removed: usize,
    pub equipment_removed: usize,
    pub associations_removed: usize,
    pub orphan_rows_dropped: usize,

    pub audit: Vec<AuditEntry>,
}

impl RunReport {
    pub fn new(started_at: impl Into<String>) -> Self {
        Self {
            started_at: started_at.into(),
            ..Self::default()
        }
    }

    pub fn absorb_router(&mut self, stats: &RouterStats) {
        self.dataset_fills += stats.dataset_fills;
        self.template_fills += stats.template_fills;
        self.ai_fills += stats.ai_fills;
        self.web_citations += stats.web_citations;
        self.unverified_fills += stats.unverified_fills;
        self.ai_calls += stats.ai_calls;
        self.web_calls += stats.web_calls;
        self.cache_hits += stats.cache_hits;
        self.budget_exhausted_fields += stats.budget_exhausted_fields;
        self.failed_calls += stats.failed_calls;
    }

    pub fn absorb_dedup(&mut self, report: &DedupReport) {
        self.exact_duplicate_groups = report.exact_groups.len();
        self.near_duplicates = report.near_duplicates.len();
    }

    pub fn absorb_prune(&mut self, outcome: &PruneOutcome) {
        self.movements_removed = outcome.movements_removed;
        self.equipment_removed = outcome.equipment_removed;
        self.associations_removed = outcome.associations_removed;
        self.orphan_rows_dropped = outcome.orphan_rows_dropped;
    }

    pub fn record_gate_issues(&mut self, issues: &[GateIssue]) {
        self.gate_issue_count = issues.len();
        self.needs_manual_review += issues.len();
    }

    /// Human-readable summary
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Cleaning run {}\n\n", self.started_at));

        out.push_str("## Catalog\n\n");
        out.push_str(&format!("- Rows processed: {}\n", self.rows_processed));
        out.push_str(&format!("- Rows failed: {}\n", self.rows_failed));
        out.push_str(&format!("- IDs assigned: {}\n", self.ids_assigned));
        out.push_str(&format!("- Fields normalized: {}\n", self.normalized_fields));
        out.push_str(&format!(
            "- Contradictory fields: {}\n",
            self.contradiction_fields
        ));
        out.push_str(&format!("- SVG garbage scrubbed: {}\n", self.svg_scrubbed));
        out.push_str(&format!(
            "- Records flagged for enrichment: {}\n",
            self.flagged_for_enrichment
        ));
        out.push_str(&format!(
            "- Records needing manual review: {}\n\n",
            self.needs_manual_review
        ));

        out.push_str("## Fills\n\n");
        out.push_str(&format!(
            "- Dataset: {}, template: {}, AI: {}, web-cited: {}\n",
            self.dataset_fills, self.template_fills, self.ai_fills, self.web_citations
        ));
        out.push_str(&format!(
            "- Unverified AI fills: {}\n",
            self.unverified_fills
        ));
        out.push_str(&format!(
            "- AI calls: {} (cache hits: {}), web calls: {}\n",
            self.ai_calls, self.cache_hits, self.web_calls
        ));
        out.push_str(&format!(
            "- Fields skipped on exhausted budget: {}, failed calls: {}\n\n",
            self.budget_exhausted_fields, self.failed_calls
        ));

        if self.merge_replaced > 0 || !self.merge_unknown_ids.is_empty() {
            out.push_str("## Merge\n\n");
            out.push_str(&format!("- Records replaced: {}\n", self.merge_replaced));
            if !self.merge_unknown_ids.is_empty() {
                out.push_str(&format!(
                    "- Unknown ids skipped: {}\n",
                    self.merge_unknown_ids.join(", ")
                ));
            }
            out.push('\n');
        }

        out.push_str("## Quality gate\n\n");
        out.push_str(&format!(
            "- Fields nulled: {}, markdown unwrapped: {}, critical-field issues: {}\n\n",
            self.gate_fields_nulled, self.gate_fields_unwrapped, self.gate_issue_count
        ));

        if self.exact_duplicate_groups > 0 || self.near_duplicates > 0 {
            out.push_str("## Duplicates\n\n");
            out.push_str(&format!(
                "- Exact groups: {}, near duplicates: {}\n\n",
                self.exact_duplicate_groups, self.near_duplicates
            ));
        }

        if self.movements_removed > 0
            || self.equipment_removed > 0
            || self.associations_removed > 0
            || self.orphan_rows_dropped > 0
        {
            out.push_str("## Library\n\n");
            out.push_str(&format!(
                "- Movements removed: {}, equipment removed: {}\n",
                self.movements_removed, self.equipment_removed
            ));
            out.push_str(&format!(
                "- Associations removed: {}, orphan rows dropped: {}\n\n",
                self.associations_removed, self.orphan_rows_dropped
            ));
        }

        if !self.audit.is_empty() {
            out.push_str("## Audit\n\n");
            for entry in &self.audit {
                out.push_str(&format!(
                    "- [{}] {} {}: {} -> {}",
                    entry.source,
                    entry.name.as_deref().unwrap_or(&entry.id),
                    entry.field,
                    entry.from,
                    entry.to
                ));
                if let Some(citation) = &entry.citation {
                    out.push_str(&format!(" (cite: {citation})"));
                }
                out.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markdown_contains_counters() {
        let mut report = RunReport::new("2026-08-27T12:00:00Z");
        report.rows_processed = 870;
        report.dataset_fills = 12;
        report.ai_calls = 3;
        report.merge_replaced = 2;
        report.merge_unknown_ids = vec!["99".into()];

        let md = report.render_markdown();
        assert!(md.contains("Rows processed: 870"));
        assert!(md.contains("Dataset: 12"));
        assert!(md.contains("Unknown ids skipped: 99"));
    }

    #[test]
    fn test_audit_entries_rendered() {
        let mut report = RunReport::new("2026-08-27T12:00:00Z");
        report.audit.push(AuditEntry {
            id: "1".into(),
            name: Some("JT".into()),
            field: "DifficultyTier".into(),
            from: json!("Beginner"),
            to: json!("Advanced"),
            source: "override".into(),
            citation: None,
        });

        let md = report.render_markdown();
        assert!(md.contains("[override] JT DifficultyTier"));
        assert!(md.contains("\"Advanced\""));
    }

    #[test]
    fn test_report_round_trips_as_json() {
        let mut report = RunReport::new("2026-08-27T12:00:00Z");
        report.absorb_router(&RouterStats {
            ai_calls: 5,
            cache_hits: 2,
            ..RouterStats::default()
        });

        let raw = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.ai_calls, 5);
        assert_eq!(back.cache_hits, 2);
    }
}
