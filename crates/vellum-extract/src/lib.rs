//! # Vellum Extract
//!
//! Turns one text chunk into typed entities and relationships by prompting an
//! LLM and validating whatever comes back, field by field. Extraction is
//! best-effort by contract: any failure — transport, malformed JSON, schema
//! drift — yields empty results so a bad chunk can never abort ingestion of
//! its document.

mod extractor;
mod response;

pub use extractor::EntityExtractor;
