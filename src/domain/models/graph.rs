//! Knowledge graph nodes, edges, and extraction results.

use serde::{Deserialize, Serialize};

use super::degradation::Degradation;

/// An entity. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub source: String,
}

/// A directed, labelled relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub relation: String,
    pub source: String,
}

/// Edge attributes stored on the in-memory graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeAttrs {
    pub relation: String,
    pub source: String,
}

/// On-disk shape of the graph file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// Entity as returned by the extraction model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type", default = "unknown_type")]
    pub entity_type: String,
}

/// Relation as returned by the extraction model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    #[serde(default = "related_to")]
    pub relation: String,
}

fn unknown_type() -> String {
    "unknown".to_string()
}

fn related_to() -> String {
    "related_to".to_string()
}

/// Entities and relations extracted from one text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

/// Extraction plus the fallback taken, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionOutcome {
    pub extraction: Extraction,
    pub degradation: Option<Degradation>,
}

/// Result of adding text to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphUpdate {
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub edges_added: usize,
    pub degradations: Vec<Degradation>,
}

impl GraphUpdate {
    pub const fn changed(&self) -> bool {
        self.nodes_added > 0 || self.nodes_updated > 0 || self.edges_added > 0
    }
}

/// An entity reached by a graph query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityHit {
    pub name: String,
    pub entity_type: String,
    pub source: String,
    /// Traversal distance from the nearest matched seed entity.
    pub hop: usize,
}

/// Node and edge counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}
