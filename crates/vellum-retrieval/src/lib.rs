//! # Vellum Retrieval
//!
//! The query-time half of the system:
//!
//! - [`retriever`]: hybrid retrieval — vector similarity search seeds a
//!   bounded graph traversal, and the two result sets are fused into one
//!   ordered, deduplicated, provenance-tagged context list
//! - [`engine`]: renders that context into a bounded prompt and asks the
//!   LLM for a cited answer

pub mod engine;
pub mod retriever;

pub use engine::QueryEngine;
pub use retriever::HybridRetriever;
