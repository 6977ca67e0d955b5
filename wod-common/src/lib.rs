//! Shared types for the WOD data pipeline
//!
//! Common record model, library entities, knowledge configuration, and
//! error types used by the data cleaner crate.

pub mod config;
pub mod error;
pub mod library;
pub mod record;

pub use error::{Error, Result};
