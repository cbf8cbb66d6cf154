//! Document chunking

use std::path::Path;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{debug, info};

use vellum_core::{Chunk, JsonMap};

/// Default chunk size (characters)
const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between chunks (characters)
const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Maximum chunk size to prevent memory issues
const MAX_CHUNK_SIZE: usize = 8000;

/// Splits document text into ordered chunks with positional metadata.
///
/// The split policy (window size, overlap, boundary snapping) is opaque to
/// callers; the contract is ordered, non-overlapping-by-index chunks whose
/// metadata carries `chunk_id`, `chunk_index` and `total_chunks`.
pub trait DocumentChunker: Send + Sync {
    /// Chunk `text`, inheriting `metadata` into every chunk.
    fn chunk(&self, text: &str, metadata: &JsonMap) -> Vec<Chunk>;
}

/// Sliding character-window chunker with word-boundary snapping.
#[derive(Debug, Clone)]
pub struct WindowChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowChunker {
    /// Chunker with the default window (1000 chars, 200 overlap).
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Chunker with a custom window.
    pub fn with_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("Chunk size must be greater than 0");
        }
        if chunk_overlap >= chunk_size {
            bail!("Chunk overlap must be less than chunk size");
        }
        if chunk_size > MAX_CHUNK_SIZE {
            bail!("Chunk size exceeds maximum allowed size");
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split text into window spans, snapping the cut to the last whitespace
    /// in the second half of the window so words stay whole.
    fn split_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = usize::min(start + self.chunk_size, chars.len());
            let mut end = hard_end;

            if hard_end < chars.len() {
                if let Some(ws) = chars[start..hard_end]
                    .iter()
                    .rposition(|c| c.is_whitespace())
                {
                    if ws > self.chunk_size / 2 {
                        end = start + ws;
                    }
                }
            }

            let span: String = chars[start..end].iter().collect();
            let trimmed = span.trim();
            if !trimmed.is_empty() {
                spans.push(trimmed.to_string());
            }

            if end >= chars.len() {
                break;
            }
            // Overlap with the tail of this window; always move forward
            start = usize::max(end.saturating_sub(self.chunk_overlap), start + 1);
        }

        spans
    }
}

impl DocumentChunker for WindowChunker {
    fn chunk(&self, text: &str, metadata: &JsonMap) -> Vec<Chunk> {
        debug!(
            "Chunking document: {}",
            metadata
                .get("filename")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
        );

        let stem = document_stem(metadata);
        let spans = self.split_windows(text);
        let total = spans.len();

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let id = Chunk::derive_id(&stem, index);
                let mut chunk_metadata = metadata.clone();
                chunk_metadata.insert("chunk_id".into(), Value::from(id.clone()));
                chunk_metadata.insert("chunk_index".into(), Value::from(index as i64));
                chunk_metadata.insert("total_chunks".into(), Value::from(total as i64));

                Chunk {
                    id,
                    text,
                    index,
                    metadata: chunk_metadata,
                }
            })
            .collect();

        info!("Created {} chunks from document", chunks.len());
        chunks
    }
}

/// Stem of the document filename, the namespace for chunk ids.
fn document_stem(metadata: &JsonMap) -> String {
    metadata
        .get("filename")
        .and_then(|v| v.as_str())
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "doc".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(filename: &str) -> JsonMap {
        let mut m = JsonMap::new();
        m.insert("filename".into(), json!(filename));
        m.insert("total_pages".into(), json!(1));
        m
    }

    #[test]
    fn constructor_validates_window() {
        assert!(WindowChunker::with_chunking(0, 0).is_err());
        assert!(WindowChunker::with_chunking(100, 100).is_err());
        assert!(WindowChunker::with_chunking(100, 150).is_err());
        assert!(WindowChunker::with_chunking(MAX_CHUNK_SIZE + 1, 10).is_err());
        assert!(WindowChunker::with_chunking(100, 20).is_ok());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = WindowChunker::new();
        let chunks = chunker.chunk("A short document.", &metadata("handbook.txt"));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "handbook_chunk_0");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "A short document.");
        assert_eq!(chunks[0].metadata.get("chunk_index"), Some(&json!(0)));
        assert_eq!(chunks[0].metadata.get("total_chunks"), Some(&json!(1)));
        // Inherited metadata survives
        assert_eq!(
            chunks[0].metadata.get("filename"),
            Some(&json!("handbook.txt"))
        );
    }

    #[test]
    fn long_text_produces_ordered_overlapping_windows() {
        let chunker = WindowChunker::with_chunking(100, 20).unwrap();
        let words: Vec<String> = (0..120).map(|i| format!("word{i}")).collect();
        let text = words.join(" ");

        let chunks = chunker.chunk(&text, &metadata("long.txt"));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.id, format!("long_chunk_{i}"));
            assert!(chunk.text.chars().count() <= 100);
            assert_eq!(
                chunk.metadata.get("total_chunks"),
                Some(&json!(chunks.len() as i64))
            );
        }

        // Nothing is lost: every word appears in some chunk
        for word in &words {
            assert!(
                chunks.iter().any(|c| c.text.contains(word.as_str())),
                "missing {word}"
            );
        }
    }

    #[test]
    fn cuts_snap_to_word_boundaries() {
        let chunker = WindowChunker::with_chunking(50, 10).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu";

        let chunks = chunker.chunk(&text, &metadata("words.txt"));

        for chunk in &chunks {
            assert!(!chunk.text.starts_with(' '));
            assert!(!chunk.text.ends_with(' '));
            // Every piece is made of whole words from the source
            for word in chunk.text.split_whitespace() {
                assert!(text.contains(word));
            }
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = WindowChunker::new();
        assert!(chunker.chunk("", &metadata("empty.txt")).is_empty());
        assert!(chunker.chunk("   \n  ", &metadata("blank.txt")).is_empty());
    }

    #[test]
    fn stem_drops_the_extension() {
        let chunker = WindowChunker::new();
        let chunks = chunker.chunk("text", &metadata("employee_handbook.md"));
        assert_eq!(chunks[0].id, "employee_handbook_chunk_0");
    }

    #[test]
    fn missing_filename_falls_back() {
        let chunker = WindowChunker::new();
        let chunks = chunker.chunk("text", &JsonMap::new());
        assert_eq!(chunks[0].id, "doc_chunk_0");
    }
}
