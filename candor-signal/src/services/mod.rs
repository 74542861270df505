//! Signal-computation services
//!
//! The session-scoped pipeline: fact store and merge engine,
//! contradiction scoring, cultural-fit scoring, culture-values
//! parsing, and the orchestrator that sequences them per chunk.

pub mod contradiction;
pub mod cultural_fit;
pub mod culture;
pub mod fact_store;
pub mod orchestrator;

pub use fact_store::{FactProfile, FactStore};
pub use orchestrator::{ExtractionCadence, SessionCommand, SessionOrchestrator, SessionSnapshot};
