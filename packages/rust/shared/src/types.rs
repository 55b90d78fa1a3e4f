//! Concept schema shared by every extraction tier.
//!
//! The serialized shape (camelCase keys, `type` discriminators) is what
//! downstream renderers consume, so field renames here are breaking changes.

use serde::{Deserialize, Serialize};

/// Clamp a score into `[0, 1]`. `NaN` collapses to `0`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Archetype
// ---------------------------------------------------------------------------

/// Visualization shape a text most resembles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    /// Ordered steps or stages.
    Sequential,
    /// Parent/child containment.
    Hierarchical,
    /// Side-by-side contrast.
    Comparative,
    /// Repeating loops.
    Cyclical,
    /// Cause and effect chains.
    Causal,
    /// Fallback concept map.
    #[default]
    General,
}

impl Archetype {
    /// Every archetype, specific ones first, in tie-break order.
    pub const ALL: [Archetype; 6] = [
        Self::Sequential,
        Self::Hierarchical,
        Self::Comparative,
        Self::Cyclical,
        Self::Causal,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Hierarchical => "hierarchical",
            Self::Comparative => "comparative",
            Self::Cyclical => "cyclical",
            Self::Causal => "causal",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Node / Edge
// ---------------------------------------------------------------------------

/// A single concept in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Stable identifier, assigned once by lexical extraction (`t1-<rank>`).
    pub id: String,
    /// Display label.
    pub label: String,
    /// Importance in `[0, 1]`.
    pub weight: f64,
    /// Theme/cluster name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Role from a caller-supplied vocabulary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_role: Option<String>,
    /// One-sentence description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            weight: clamp_unit(weight),
            theme: None,
            mode_role: None,
            details: None,
        }
    }
}

/// A relationship between two nodes, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Strength in `[0, 1]`.
    pub strength: f64,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, strength: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
            kind: None,
            strength: clamp_unit(strength),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// True if this edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A relationship rendered with node labels instead of ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Label-level summary of the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// The concept graph produced and refined by each tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: Archetype,
    pub title: String,
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Schema {
    /// An empty schema, the result of extracting from empty text.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Rebuild `metadata` from the current nodes and edges.
    pub fn refresh_metadata(&mut self) {
        let concepts = self.nodes.iter().map(|n| n.label.clone()).collect();
        let relationships = self
            .edges
            .iter()
            .filter_map(|e| {
                let from = self.node(&e.source)?;
                let to = self.node(&e.target)?;
                Some(Relationship {
                    from: from.label.clone(),
                    to: to.label.clone(),
                    label: e.label.clone(),
                })
            })
            .collect();
        self.metadata = Metadata {
            concepts,
            relationships,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(0.25), 0.25);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[test]
    fn constructors_clamp() {
        assert_eq!(Node::new("a", "A", 3.0).weight, 1.0);
        assert_eq!(Edge::new("a", "b", -1.0).strength, 0.0);
    }

    #[test]
    fn schema_serializes_with_renderer_keys() {
        let mut node = Node::new("t1-0", "Solar Power", 1.0);
        node.mode_role = Some("input".into());
        let schema = Schema {
            kind: Archetype::Sequential,
            title: "Solar Power".into(),
            description: String::new(),
            nodes: vec![node],
            edges: vec![Edge::new("t1-0", "t1-1", 0.5).with_kind("co-occurrence")],
            metadata: Metadata::default(),
        };

        let json = serde_json::to_value(&schema).expect("serialize");
        assert_eq!(json["type"], "sequential");
        assert_eq!(json["nodes"][0]["modeRole"], "input");
        assert!(json["nodes"][0].get("theme").is_none());
        assert_eq!(json["edges"][0]["type"], "co-occurrence");

        let parsed: Schema = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, schema);
    }

    #[test]
    fn refresh_metadata_uses_labels() {
        let mut schema = Schema {
            nodes: vec![Node::new("a", "Alpha", 1.0), Node::new("b", "Beta", 0.5)],
            edges: vec![Edge::new("a", "b", 0.5).with_label("feeds")],
            ..Schema::empty()
        };
        schema.refresh_metadata();
        assert_eq!(schema.metadata.concepts, vec!["Alpha", "Beta"]);
        assert_eq!(schema.metadata.relationships[0].from, "Alpha");
        assert_eq!(schema.metadata.relationships[0].label.as_deref(), Some("feeds"));
    }

    #[test]
    fn edge_connects_is_unordered() {
        let edge = Edge::new("a", "b", 0.3);
        assert!(edge.connects("b", "a"));
        assert!(!edge.connects("a", "c"));
    }

    #[test]
    fn schema_without_nodes_is_empty() {
        assert!(Schema::empty().is_empty());
        let schema = Schema {
            nodes: vec![Node::new("t1-0", "Sun", 1.0)],
            ..Schema::empty()
        };
        assert!(!schema.is_empty());
    }

    #[test]
    fn archetype_display() {
        assert_eq!(Archetype::Causal.to_string(), "causal");
        assert_eq!(Archetype::default(), Archetype::General);
    }
}
