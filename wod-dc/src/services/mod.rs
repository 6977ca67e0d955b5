//! Pipeline services
//!
//! One service per cleaning concern. All of them are deterministic and
//! synchronous except the Fill Router, which talks to the external
//! collaborators.

pub mod classifier;
pub mod dedup;
pub mod fill_router;
pub mod library_pruner;
pub mod merger;
pub mod normalizer;
pub mod overrides;
pub mod quality_gate;
pub mod report;

pub use classifier::{PlaceholderMatcher, QualityClassifier};
pub use dedup::DedupReport;
pub use fill_router::{DatasetPatterns, FillRouter, RouterStats};
pub use library_pruner::LibraryPruner;
pub use merger::{merge, MergeOutcome};
pub use normalizer::Normalizer;
pub use overrides::OverrideApplier;
pub use quality_gate::{GateOutcome, QualityGate};
pub use report::{AuditEntry, RunReport};
