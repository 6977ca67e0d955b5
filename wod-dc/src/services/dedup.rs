//! Duplicate detector
//!
//! Report-only: groups records whose names collapse to the same
//! canonical form and pairs whose canonical forms are nearly identical
//! by Jaro-Winkler similarity. Nothing is deleted or merged; a human
//! decides what to do with the report.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use strsim::jaro_winkler;

use wod_common::record::Workout;

/// Similarity at or above this is reported as a near duplicate
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.93;

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, punctuation stripped, whitespace collapsed
pub fn canonical_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let stripped = PUNCT_RE.replace_all(&lower, "");
    WS_RE.replace_all(stripped.trim(), " ").to_string()
}

/// Records sharing one canonical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical: String,
    /// (id, name as stored), in catalog order
    pub members: Vec<(String, String)>,
}

/// Two distinct canonical names that are suspiciously similar
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicate {
    pub left: (String, String),
    pub right: (String, String),
    pub similarity: f64,
}

#[derive(Debug, Default)]
pub struct DedupReport {
    pub exact_groups: Vec<DuplicateGroup>,
    pub near_duplicates: Vec<NearDuplicate>,
}

impl DedupReport {
    pub fn is_empty(&self) -> bool {
        self.exact_groups.is_empty() && self.near_duplicates.is_empty()
    }
}

/// Scan the catalog for duplicate and near-duplicate names
pub fn detect(workouts: &[Workout]) -> DedupReport {
    let mut by_canonical: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
    for w in workouts {
        let Some(name) = w.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let canonical = canonical_name(name);
        if canonical.is_empty() {
            continue;
        }
        by_canonical
            .entry(canonical)
            .or_default()
            .push((w.id.clone(), name.to_string()));
    }

    let exact_groups: Vec<DuplicateGroup> = by_canonical
        .iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(canonical, members)| DuplicateGroup {
            canonical: canonical.clone(),
            members: members.clone(),
        })
        .collect();

    // Pairwise over distinct canonical names; one representative each
    let reps: Vec<(&String, &(String, String))> = by_canonical
        .iter()
        .map(|(c, members)| (c, &members[0]))
        .collect();

    let mut near_duplicates = Vec::new();
    for (i, (ca, ma)) in reps.iter().enumerate() {
        for (cb, mb) in reps.iter().skip(i + 1) {
            let similarity = jaro_winkler(ca, cb);
            if similarity >= NEAR_DUPLICATE_THRESHOLD {
                near_duplicates.push(NearDuplicate {
                    left: (*ma).clone(),
                    right: (*mb).clone(),
                    similarity,
                });
            }
        }
    }

    if !exact_groups.is_empty() || !near_duplicates.is_empty() {
        tracing::info!(
            exact = exact_groups.len(),
            near = near_duplicates.len(),
            "Duplicate scan found candidates"
        );
    }

    DedupReport {
        exact_groups,
        near_duplicates,
    }
}
