//! CSV catalog and library tables
//!
//! The raw catalog arrives as CSV with human-edited headers; this module
//! maps header aliases onto canonical field names, drops embedded header
//! rows, backfills missing workout ids, and reads/writes the four
//! library tables.

use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use wod_common::library::{Equipment, Library, Movement, MovementEquipment, WorkoutMovement};
use wod_common::record::Workout;
use wod_common::{Error, Result};

/// Header aliases seen in hand-edited exports -> canonical field names
const FIELD_MAPPING: &[(&str, &str)] = &[
    ("WorkoutID", "id"),
    ("Workout ID", "id"),
    ("ID", "id"),
    ("Workout Name", "Name"),
    ("Format & Duration", "FormatDuration"),
    ("Format and Duration", "FormatDuration"),
    ("Format/Duration", "FormatDuration"),
    ("Score Type", "ScoreType"),
    ("Equipment Needed", "EquipmentNeeded"),
    ("Difficulty Tier", "DifficultyTier"),
    ("Movement Types", "MovementTypes"),
    ("Coach Notes", "CoachNotes"),
    ("Scaling Options", "ScalingOptions"),
    ("Flavor Text", "Flavor_Text"),
    ("Instructions (Clean)", "Instructions_Clean"),
];

fn canonical_header(raw: &str) -> String {
    let trimmed = raw.trim();
    FIELD_MAPPING
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CsvLoadStats {
    pub rows_read: usize,
    pub header_rows_dropped: usize,
    pub ids_assigned: usize,
    pub rows_failed: usize,
}

/// Load the workout catalog from CSV.
///
/// The id column must exist; individual rows with a blank id get a fresh
/// UUID. Rows whose Name cell repeats the literal header ("Name") are
/// artifacts of concatenated exports and are dropped. Rows the CSV
/// reader cannot parse are counted and skipped, never fatal.
pub fn load_workouts(path: &Path) -> Result<(Vec<Workout>, CsvLoadStats)> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?
        .iter()
        .map(canonical_header)
        .collect();

    if !headers.iter().any(|h| h == "id") {
        return Err(Error::MissingColumn("WorkoutID".to_string()));
    }

    let mut stats = CsvLoadStats::default();
    let mut workouts = Vec::new();

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping unreadable row: {e}");
                stats.rows_failed += 1;
                continue;
            }
        };
        stats.rows_read += 1;

        let cell = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        if cell("Name") == Some("Name") {
            stats.header_rows_dropped += 1;
            continue;
        }

        let id = match cell("id") {
            Some(id) => id.to_string(),
            None => {
                stats.ids_assigned += 1;
                Uuid::new_v4().to_string()
            }
        };

        let mut workout = Workout::new(id);
        for (i, header) in headers.iter().enumerate() {
            if header == "id" {
                continue;
            }
            let Some(value) = row.get(i).map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            workout.set_field(header, Value::String(value.to_string()));
        }
        workouts.push(workout);
    }

    tracing::info!(
        path = %path.display(),
        rows = workouts.len(),
        ids_assigned = stats.ids_assigned,
        "Loaded workout catalog"
    );
    Ok((workouts, stats))
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| Error::Parse(format!("{}: {e}", path.display()))))
        .collect()
}

fn write_table<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))?;
    }
    writer.flush()?;
    Ok(())
}

/// Standard file names for the four library tables under one directory
pub struct LibraryPaths {
    pub movements: std::path::PathBuf,
    pub equipment: std::path::PathBuf,
    pub workout_movement_map: std::path::PathBuf,
    pub movement_equipment_map: std::path::PathBuf,
}

impl LibraryPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            movements: dir.join("movements.csv"),
            equipment: dir.join("equipment.csv"),
            workout_movement_map: dir.join("workout_movement_map.csv"),
            movement_equipment_map: dir.join("movement_equipment_map.csv"),
        }
    }
}

pub fn load_library(paths: &LibraryPaths) -> Result<Library> {
    Ok(Library {
        movements: read_table::<Movement>(&paths.movements)?,
        equipment: read_table::<Equipment>(&paths.equipment)?,
        workout_movement_map: read_table::<WorkoutMovement>(&paths.workout_movement_map)?,
        movement_equipment_map: read_table::<MovementEquipment>(&paths.movement_equipment_map)?,
    })
}

pub fn write_library(paths: &LibraryPaths, library: &Library) -> Result<()> {
    write_table(&paths.movements, &library.movements)?;
    write_table(&paths.equipment, &library.equipment)?;
    write_table(&paths.workout_movement_map, &library.workout_movement_map)?;
    write_table(&paths.movement_equipment_map, &library.movement_equipment_map)?;
    Ok(())
}
