//! Extracted entities and relationships

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::JsonMap;

/// Closed set of entity kinds the extractor may produce.
///
/// The kind doubles as the node label in the graph, so the set is enforced
/// at the extraction boundary rather than trusting whatever string the LLM
/// emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Policies, rules, regulations
    Policy,
    /// Document sections, chapters, parts
    Section,
    /// Main topics or themes
    Topic,
    /// Important concepts, ideas, terms
    Concept,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Policy,
        EntityKind::Section,
        EntityKind::Topic,
        EntityKind::Concept,
    ];

    /// Node label used in the graph.
    pub fn as_label(&self) -> &'static str {
        match self {
            EntityKind::Policy => "Policy",
            EntityKind::Section => "Section",
            EntityKind::Topic => "Topic",
            EntityKind::Concept => "Concept",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "policy" => Ok(EntityKind::Policy),
            "section" => Ok(EntityKind::Section),
            "topic" => Ok(EntityKind::Topic),
            "concept" => Ok(EntityKind::Concept),
            _ => Err(UnknownEntityKind(s.to_string())),
        }
    }
}

/// Error for entity kind strings outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

/// An entity produced by the extractor, id already namespaced by chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Entity kind, used as the node label
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Globally unique id, `<chunk-id>_<local-id>`
    pub id: String,
    /// Short descriptive name
    pub name: String,
    /// Arbitrary extractor-supplied properties, flattened on write
    #[serde(default)]
    pub properties: JsonMap,
}

/// A directed, typed edge between two node ids of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Relationship type, e.g. `AFFECTS`, `RELATES_TO`
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Arbitrary extractor-supplied properties, flattened on write
    #[serde(default)]
    pub properties: JsonMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_parses_case_insensitively() {
        assert_eq!("Policy".parse::<EntityKind>().unwrap(), EntityKind::Policy);
        assert_eq!("topic".parse::<EntityKind>().unwrap(), EntityKind::Topic);
        assert_eq!("CONCEPT".parse::<EntityKind>().unwrap(), EntityKind::Concept);
        assert_eq!(" Section ".parse::<EntityKind>().unwrap(), EntityKind::Section);
    }

    #[test]
    fn entity_kind_rejects_unknown() {
        assert!("Document".parse::<EntityKind>().is_err());
        assert!("".parse::<EntityKind>().is_err());
    }

    #[test]
    fn relationship_serde_uses_type_field() {
        let rel = ExtractedRelationship {
            from: "a".into(),
            to: "b".into(),
            rel_type: "AFFECTS".into(),
            properties: JsonMap::new(),
        };

        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "AFFECTS");
        assert_eq!(json["from"], "a");
    }
}
