//! LLM response decoding
//!
//! The model is instructed to return bare JSON but routinely wraps it in a
//! markdown code fence anyway; one level of fencing is stripped before
//! parsing. The payload is then validated entry by entry — a malformed
//! entity drops that entity, not the chunk.

use serde::Deserialize;

use vellum_core::JsonMap;

/// Raw payload shape requested from the model.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawExtraction {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: JsonMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRelationship {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(rename = "type", default)]
    pub rel_type: String,
    #[serde(default)]
    pub properties: JsonMap,
}

/// Strip one level of ``` / ```json fencing, if present.
pub(crate) fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + "```json".len()..];
        return match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        };
    }

    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + "```".len()..];
        return match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        };
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_passes_through() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn json_tagged_fence_is_stripped() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn plain_fence_is_stripped() {
        let fenced = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn fence_with_leading_prose_is_stripped() {
        let fenced = "Here is the JSON you asked for:\n```json\n{\"a\": 1}\n```\nLet me know!";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_takes_the_rest() {
        let fenced = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn payload_tolerates_missing_sections() {
        let parsed: RawExtraction = serde_json::from_str("{\"entities\": []}").unwrap();
        assert!(parsed.entities.is_empty());
        assert!(parsed.relationships.is_empty());
    }
}
