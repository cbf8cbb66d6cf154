//! Document parsing

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use vellum_core::{DocumentPage, JsonMap, ParsedDocument};

/// Parses a document file into text with page metadata.
///
/// Implementations fail the caller on unreadable input; an unparseable file
/// aborts ingestion of that file.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse the file at `path`.
    async fn parse(&self, path: &Path) -> Result<ParsedDocument>;
}

/// Parser for UTF-8 text and markdown files.
///
/// Form feeds (`\x0C`) delimit pages, matching how plain-text exports of
/// paginated documents mark page breaks; files without them are one page.
#[derive(Debug, Default, Clone)]
pub struct TextParser;

impl TextParser {
    /// Create a new text parser.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for TextParser {
    async fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        debug!("Parsing document: {}", path.display());

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document {}", path.display()))?;

        let pages: Vec<DocumentPage> = raw
            .split('\u{0C}')
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(idx, text)| DocumentPage {
                number: idx + 1,
                text: text.to_string(),
            })
            .collect();

        let text = pages
            .iter()
            .map(|page| page.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut metadata = JsonMap::new();
        metadata.insert("filename".into(), Value::from(filename.clone()));
        metadata.insert("file_path".into(), Value::from(path.display().to_string()));
        metadata.insert("total_pages".into(), Value::from(pages.len() as i64));

        info!("Parsed {} pages from {}", pages.len(), filename);

        Ok(ParsedDocument {
            text,
            metadata,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn parse_str(content: &str) -> ParsedDocument {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        TextParser::new().parse(file.path()).await.unwrap()
    }

    #[tokio::test]
    async fn single_page_document() {
        let parsed = parse_str("Just one page of text.").await;

        assert_eq!(parsed.pages.len(), 1);
        assert_eq!(parsed.text, "Just one page of text.");
        assert_eq!(parsed.metadata.get("total_pages").unwrap(), 1);
    }

    #[tokio::test]
    async fn form_feeds_split_pages() {
        let parsed = parse_str("page one\u{0C}page two\u{0C}\u{0C}page four").await;

        // The empty third segment is dropped, original numbering kept
        assert_eq!(parsed.pages.len(), 3);
        assert_eq!(parsed.pages[0].number, 1);
        assert_eq!(parsed.pages[2].number, 4);
        assert_eq!(parsed.text, "page one\n\npage two\n\npage four");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = TextParser::new()
            .parse(Path::new("/nonexistent/never.txt"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn metadata_records_the_filename() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"content").unwrap();
        let parsed = TextParser::new().parse(file.path()).await.unwrap();

        let filename = parsed.filename().unwrap();
        assert!(!filename.is_empty());
        assert!(parsed.metadata.contains_key("file_path"));
    }
}
