//! # Vellum Core
//!
//! Shared data model and store abstractions for the Vellum retrieval engine.
//!
//! ## Modules
//!
//! - [`document`]: parsed documents and text chunks
//! - [`entity`]: extracted entities and relationships
//! - [`retrieval`]: search hits, traversal nodes and query-time context
//! - [`properties`]: the primitive-only property model enforced at every
//!   graph/vector write boundary
//! - [`traits`]: `GraphStore` and `VectorIndex` service abstractions
//! - [`test_support`]: in-memory mock stores (behind the `test-utils` feature)

pub mod document;
pub mod entity;
pub mod error;
pub mod properties;
pub mod retrieval;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use document::{Chunk, DocumentPage, JsonMap, ParsedDocument};
pub use entity::{EntityKind, ExtractedEntity, ExtractedRelationship};
pub use error::{StoreError, StoreResult};
pub use properties::{flatten_properties, properties_to_json, PropertyValue};
pub use retrieval::{
    chunk_ids, ContextItem, ContextSource, GraphNode, QueryOutcome, RetrievalInfo,
    RetrievalOutcome, SearchHit, SourceCitation, StoredChunk,
};
pub use traits::{GraphStore, VectorIndex};
