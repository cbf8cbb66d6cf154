//! Test doubles for the store traits
//!
//! In-memory, deterministic implementations of [`crate::traits::GraphStore`]
//! and [`crate::traits::VectorIndex`] so pipeline and retrieval logic can be
//! exercised without a running Neo4j or LanceDB.

mod mocks;

pub use mocks::{MockGraphStore, MockVectorIndex};
