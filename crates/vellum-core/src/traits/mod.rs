//! Store abstractions consumed by the ingestion and retrieval pipelines
//!
//! Both stores are dependency-injected service objects: constructed once at
//! process start and passed by `Arc` handle, never reached through globals.

pub mod graph;
pub mod vector;

pub use graph::{GraphStore, TRAVERSAL_NODE_CAP};
pub use vector::VectorIndex;
