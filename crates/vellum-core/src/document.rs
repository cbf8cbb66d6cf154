//! Parsed documents and text chunks

use serde::{Deserialize, Serialize};

/// Flattened-on-write metadata carried by documents, chunks and search hits.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Output of a document parser: full text plus page-level breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Full extracted text, pages joined in order
    pub text: String,
    /// Document metadata (`filename`, `file_path`, `total_pages`, ...)
    pub metadata: JsonMap,
    /// Per-page text spans
    pub pages: Vec<DocumentPage>,
}

impl ParsedDocument {
    /// Original filename recorded by the parser, if present.
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(|v| v.as_str())
    }
}

/// One page of a parsed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    /// 1-based page number
    pub number: usize,
    /// Page text
    pub text: String,
}

/// A bounded, ordered span of a document's text.
///
/// Chunks are the atomic unit of both embedding and graph anchoring: the
/// vector index and the graph store key them by the same id, which is how
/// query-time results from the two engines are joined back together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Globally unique id, `<document-stem>_chunk_<index>`
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Position within the owning document
    pub index: usize,
    /// Inherited document metadata plus `chunk_id`, `chunk_index` and
    /// `total_chunks`
    pub metadata: JsonMap,
}

impl Chunk {
    /// Derive the chunk id for `index` within the document named by `stem`.
    pub fn derive_id(stem: &str, index: usize) -> String {
        format!("{}_chunk_{}", stem, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_derivation() {
        assert_eq!(Chunk::derive_id("handbook", 0), "handbook_chunk_0");
        assert_eq!(Chunk::derive_id("doc_x", 12), "doc_x_chunk_12");
    }

    #[test]
    fn parsed_document_filename() {
        let mut metadata = JsonMap::new();
        metadata.insert("filename".into(), "handbook.txt".into());

        let parsed = ParsedDocument {
            text: String::new(),
            metadata,
            pages: Vec::new(),
        };

        assert_eq!(parsed.filename(), Some("handbook.txt"));
    }
}
