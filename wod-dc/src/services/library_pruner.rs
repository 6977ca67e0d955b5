//! Movement/equipment library pruner
//!
//! Earlier scraping passes left parsing artifacts in the entity tables:
//! bare weights, rep schemes, stray parenthesized fragments, and
//! over-long strings that are clearly swallowed sentences. The pruner
//! removes entities matching the artifact patterns, cascades the
//! deletion through the association maps, then verifies referential
//! integrity and drops any association row pointing at a missing entity.

use regex::Regex;
use std::collections::BTreeSet;

use wod_common::config::KnowledgeConfig;
use wod_common::library::Library;
use wod_common::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    pub movements_removed: usize,
    pub equipment_removed: usize,
    pub associations_removed: usize,
    pub orphan_rows_dropped: usize,
}

pub struct LibraryPruner {
    patterns: Vec<Regex>,
    max_name_len: usize,
}

impl LibraryPruner {
    pub fn new(config: &KnowledgeConfig) -> Result<Self> {
        let patterns = config
            .artifact_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){p}"))
                    .map_err(|e| Error::Config(format!("bad artifact pattern {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            max_name_len: config.max_entity_name_len,
        })
    }

    /// True when an entity name is a parsing artifact, not a real entity
    pub fn is_artifact(&self, name: &str) -> bool {
        let name = name.trim();
        name.is_empty()
            || name.len() > self.max_name_len
            || self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Prune artifacts and repair the association maps in place
    pub fn prune(&self, library: &mut Library) -> PruneOutcome {
        let mut outcome = PruneOutcome::default();

        let removed_movements: BTreeSet<String> = library
            .movements
            .iter()
            .filter(|m| self.is_artifact(&m.name))
            .map(|m| m.movement_id.clone())
            .collect();
        let removed_equipment: BTreeSet<String> = library
            .equipment
            .iter()
            .filter(|e| self.is_artifact(&e.name))
            .map(|e| e.equipment_id.clone())
            .collect();

        for m in library
            .movements
            .iter()
            .filter(|m| removed_movements.contains(&m.movement_id))
        {
            tracing::debug!(id = %m.movement_id, name = %m.name, "Pruning movement artifact");
        }

        outcome.movements_removed = removed_movements.len();
        outcome.equipment_removed = removed_equipment.len();
        library
            .movements
            .retain(|m| !removed_movements.contains(&m.movement_id));
        library
            .equipment
            .retain(|e| !removed_equipment.contains(&e.equipment_id));

        // Cascade: drop association rows that referenced a pruned entity
        let before = library.workout_movement_map.len() + library.movement_equipment_map.len();
        library
            .workout_movement_map
            .retain(|row| !removed_movements.contains(&row.movement_id));
        library.movement_equipment_map.retain(|row| {
            !removed_movements.contains(&row.movement_id)
                && !removed_equipment.contains(&row.equipment_id)
        });
        outcome.associations_removed =
            before - library.workout_movement_map.len() - library.movement_equipment_map.len();

        outcome.orphan_rows_dropped = Self::verify_integrity(library);
        outcome
    }

    /// Drop association rows pointing at entities that do not exist.
    /// Returns the number of rows dropped.
    pub fn verify_integrity(library: &mut Library) -> usize {
        let movement_ids: BTreeSet<&str> = library
            .movements
            .iter()
            .map(|m| m.movement_id.as_str())
            .collect();
        let equipment_ids: BTreeSet<&str> = library
            .equipment
            .iter()
            .map(|e| e.equipment_id.as_str())
            .collect();

        let before = library.workout_movement_map.len() + library.movement_equipment_map.len();
        library
            .workout_movement_map
            .retain(|row| movement_ids.contains(row.movement_id.as_str()));
        library.movement_equipment_map.retain(|row| {
            movement_ids.contains(row.movement_id.as_str())
                && equipment_ids.contains(row.equipment_id.as_str())
        });
        let dropped =
            before - library.workout_movement_map.len() - library.movement_equipment_map.len();

        if dropped > 0 {
            tracing::warn!(count = dropped, "Dropped orphan association rows");
        }
        dropped
    }
}
