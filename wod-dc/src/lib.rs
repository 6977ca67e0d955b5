//! wod-dc library interface
//!
//! Exposes the cleaning/enrichment services, collaborator clients, and
//! pipeline orchestration for integration testing.

pub mod clients;
pub mod io;
pub mod pipeline;
pub mod services;
