//! Movement and equipment library entities
//!
//! Separate, smaller tables than the workout catalog: movements and
//! equipment each have a stable id and display name, and participate in
//! many-to-many association maps referencing both sides by identity.

use serde::{Deserialize, Serialize};

/// One movement entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(rename = "MovementID")]
    pub movement_id: String,
    #[serde(rename = "Movement")]
    pub name: String,
}

/// One equipment entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "EquipmentID")]
    pub equipment_id: String,
    #[serde(rename = "Equipment")]
    pub name: String,
}

/// Association row: a workout uses a movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutMovement {
    #[serde(rename = "WorkoutID")]
    pub workout_id: String,
    #[serde(rename = "MovementID")]
    pub movement_id: String,
}

/// Association row: a movement requires equipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEquipment {
    #[serde(rename = "MovementID")]
    pub movement_id: String,
    #[serde(rename = "EquipmentID")]
    pub equipment_id: String,
}

/// The full movement/equipment library with its association maps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    pub movements: Vec<Movement>,
    pub equipment: Vec<Equipment>,
    pub workout_movement_map: Vec<WorkoutMovement>,
    pub movement_equipment_map: Vec<MovementEquipment>,
}
