//! Shared data models for the PuffScan backend.
//!
//! This crate provides Serde-serializable types for:
//! - The clinical action catalogue and reference-point catalogue
//! - Per-window observations collected during a scan
//! - The observation store ("prompt bank") each analyzer run fills in
//! - Cross-run aggregation of parallel analyzer results

pub mod aggregate;
pub mod catalog;
pub mod observation;
pub mod store;

// Re-export common types
pub use aggregate::{aggregate, AggregateError, AggregatedStore};
pub use catalog::{ActionCatalog, ActionEntry, ReferenceCatalog, ReferenceEntry};
pub use observation::{Answer, Observation};
pub use store::{ActionSlot, ObservationStore, QuestionMap, ReferenceSlot};
