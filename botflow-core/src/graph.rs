//! Graph document model.
//!
//! The editor persists a worker's visual graph as an opaque JSON blob of
//! nodes and edges. This module parses a snapshot of that blob into an
//! immutable, read-only document. Referential integrity between edges and
//! node ids is NOT guaranteed by the store; consumers must resolve ids
//! through [`GraphDocument::label_of`] and decide what to do with dangling
//! endpoints themselves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ── Node payloads (discriminated by the persisted `type` field) ──

/// Payload of a `start` or `exit` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlData {
    pub label: String,
}

/// Payload of a `function` node placed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload of a `variable` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A node's payload, keyed by its persisted `type` discriminator.
///
/// Unknown discriminators are kept as an explicit, reportable variant
/// rather than cast into one of the known shapes; the compiler skips them
/// but diagnostics can still name them.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Start(ControlData),
    Exit(ControlData),
    Function(FunctionData),
    Variable(VariableData),
    Unknown { kind: String, data: serde_json::Value },
}

impl NodePayload {
    /// The node's display label, if its payload carries one.
    pub fn label(&self) -> Option<&str> {
        match self {
            NodePayload::Start(d) | NodePayload::Exit(d) => Some(&d.label),
            NodePayload::Function(d) => Some(&d.label),
            NodePayload::Variable(d) => d.label.as_deref(),
            NodePayload::Unknown { .. } => None,
        }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub payload: NodePayload,
}

// ── Edge ──

/// A graph edge. Handles are optional in persisted documents (the editor
/// writes `null` for plain data links).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: Option<String>,
    #[serde(rename = "targetHandle", default)]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ── Raw persisted shape ──

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

// ── Document ──

/// An immutable snapshot of a persisted graph document.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDocument {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    by_id: HashMap<String, usize>,
}

impl GraphDocument {
    /// Parse a persisted blob. An all-whitespace blob is reported as
    /// [`ParseError::Empty`] so callers can distinguish a never-saved
    /// document from a corrupt one; no partial document is ever returned.
    pub fn parse(raw: &[u8]) -> Result<GraphDocument, ParseError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ParseError::Corrupt(format!("not utf-8: {e}")))?;
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let raw_doc: RawDocument =
            serde_json::from_str(text).map_err(|e| ParseError::Corrupt(e.to_string()))?;

        let mut nodes = Vec::with_capacity(raw_doc.nodes.len());
        for raw_node in raw_doc.nodes {
            let payload = parse_payload(&raw_node)?;
            nodes.push(Node {
                id: raw_node.id,
                payload,
            });
        }

        let by_id = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        Ok(GraphDocument {
            nodes,
            edges: raw_doc.edges,
            by_id,
        })
    }

    /// An empty document (no nodes, no edges). Stands in for a blob the
    /// editor has not written yet.
    pub fn empty() -> GraphDocument {
        GraphDocument {
            nodes: Vec::new(),
            edges: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The display label of the node with the given id, if the node exists
    /// and its payload carries a label.
    pub fn label_of(&self, node_id: &str) -> Option<&str> {
        self.node(node_id).and_then(|n| n.payload.label())
    }
}

fn parse_payload(raw: &RawNode) -> Result<NodePayload, ParseError> {
    let corrupt = |e: serde_json::Error| {
        ParseError::Corrupt(format!("node '{}' ({}): {}", raw.id, raw.kind, e))
    };
    let payload = match raw.kind.as_str() {
        "start" => NodePayload::Start(serde_json::from_value(raw.data.clone()).map_err(corrupt)?),
        "exit" => NodePayload::Exit(serde_json::from_value(raw.data.clone()).map_err(corrupt)?),
        "function" => {
            NodePayload::Function(serde_json::from_value(raw.data.clone()).map_err(corrupt)?)
        }
        "variable" => {
            NodePayload::Variable(serde_json::from_value(raw.data.clone()).map_err(corrupt)?)
        }
        other => NodePayload::Unknown {
            kind: other.to_string(),
            data: raw.data.clone(),
        },
    };
    Ok(payload)
}
