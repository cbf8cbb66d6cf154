//! # Vellum Neo4j
//!
//! Neo4j-backed implementation of [`vellum_core::GraphStore`].
//!
//! All writes are MERGE-based so re-running an ingestion is idempotent, and
//! every property map is flattened to the primitive-only model before it
//! reaches the wire — Neo4j rejects nested property values.

mod params;
mod store;

pub use store::Neo4jStore;
