//! File formats: CSV tables in, JSON catalogs and reports out

pub mod csv_tables;
pub mod json_store;

pub use csv_tables::{load_library, load_workouts, write_library, CsvLoadStats, LibraryPaths};
pub use json_store::{read_workouts, write_report, write_workouts};
