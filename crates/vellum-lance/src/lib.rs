//! # Vellum Lance
//!
//! LanceDB-backed implementation of [`vellum_core::VectorIndex`].
//!
//! Chunks are embedded through an injected [`vellum_llm::EmbeddingProvider`]
//! and stored with their full (flattened) metadata, so `chunk_id` and
//! `filename` can be recovered at query time without touching the graph.

mod store;

pub use store::LanceVectorStore;
