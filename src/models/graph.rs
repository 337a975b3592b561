// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Argument graph model and loading.
//!
//! Graphs are read from the arguebuf JSON interchange format (the protobuf
//! JSON mapping of an argument graph) or from plain text files. The parsed
//! document is kept so it can be forwarded to the services unchanged.

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::rules::AdaptationRules;
use crate::models::wire::AnnotatedGraph;
use crate::services::graph2text::{graph2text, Graph2TextAlgorithm};

/// Kind of argumentation scheme connecting atom nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    Support,
    Attack,
    Rephrase,
    Preference,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Claim or premise with its text
    Atom { text: String },
    /// Relation between atoms; `None` if the scheme is not specified
    Scheme(Option<SchemeKind>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// An argument graph.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: BTreeMap<String, NodeKind>,
    edges: BTreeMap<String, Edge>,
    resources: BTreeMap<String, String>,
    major_claim: Option<String>,
    userdata: Userdata,
    document: Value,
}

/// Benchmark data stored by annotators in the graph's userdata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Userdata {
    #[serde(default, rename = "cbrEvaluations")]
    pub cbr_evaluations: Vec<CbrEvaluation>,
}

/// One user's expected results for a query.
#[derive(Debug, Clone, Deserialize)]
pub struct CbrEvaluation {
    /// Expected rank per case id (1 is best)
    pub ranking: BTreeMap<String, u32>,
    #[serde(default)]
    pub generalizations: Option<BTreeMap<String, AdaptationRules>>,
    #[serde(default)]
    pub specializations: Option<BTreeMap<String, AdaptationRules>>,
    #[serde(default)]
    pub name: Option<String>,
}

// ─── Document format ─────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    #[serde(default)]
    nodes: BTreeMap<String, NodeDocument>,
    #[serde(default)]
    edges: BTreeMap<String, EdgeDocument>,
    #[serde(default)]
    resources: BTreeMap<String, ResourceDocument>,
    #[serde(default, alias = "major_claim")]
    major_claim: Option<String>,
}

#[derive(Deserialize)]
struct NodeDocument {
    #[serde(default)]
    atom: Option<AtomDocument>,
    #[serde(default)]
    scheme: Option<SchemeDocument>,
}

#[derive(Deserialize)]
struct AtomDocument {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct SchemeDocument {
    #[serde(default)]
    support: Option<Value>,
    #[serde(default)]
    attack: Option<Value>,
    #[serde(default)]
    rephrase: Option<Value>,
    #[serde(default)]
    preference: Option<Value>,
}

#[derive(Deserialize)]
struct EdgeDocument {
    source: String,
    target: String,
}

#[derive(Deserialize)]
struct ResourceDocument {
    #[serde(default)]
    text: String,
}

impl Graph {
    /// Load a graph, choosing the format by file extension.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let contents = fs::read_to_string(path).map_err(|e| GraphError::IoError(e.to_string()))?;

        match extension.as_deref() {
            Some("json") => Self::load_from_json(&contents),
            Some("txt") => Ok(Self::from_text(&contents)),
            other => Err(GraphError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Load a graph from an arguebuf JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, GraphError> {
        let document: Value =
            serde_json::from_str(json_data).map_err(|e| GraphError::ParseError(e.to_string()))?;
        Self::from_document(document)
    }

    /// Build a graph from an already parsed arguebuf document.
    pub fn from_document(document: Value) -> Result<Self, GraphError> {
        let parsed = GraphDocument::deserialize(&document)
            .map_err(|e| GraphError::ParseError(e.to_string()))?;

        let userdata = match document.get("userdata") {
            Some(Value::Null) | None => Userdata::default(),
            Some(value) => Userdata::deserialize(value)
                .map_err(|e| GraphError::UserdataError(e.to_string()))?,
        };

        let nodes: BTreeMap<String, NodeKind> = parsed
            .nodes
            .into_iter()
            .map(|(id, node)| {
                let kind = Self::convert_node(&id, node)?;
                Ok((id, kind))
            })
            .collect::<Result<_, GraphError>>()?;

        let edges: BTreeMap<String, Edge> = parsed
            .edges
            .into_iter()
            .map(|(id, edge)| (id, Edge {
                source: edge.source,
                target: edge.target,
            }))
            .collect();

        for (id, edge) in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !nodes.contains_key(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        let resources = parsed
            .resources
            .into_iter()
            .map(|(id, resource)| (id, resource.text))
            .collect();

        Ok(Self {
            nodes,
            edges,
            resources,
            major_claim: parsed.major_claim.filter(|id| !id.is_empty()),
            userdata,
            document,
        })
    }

    fn convert_node(id: &str, node: NodeDocument) -> Result<NodeKind, GraphError> {
        match (node.atom, node.scheme) {
            (Some(atom), None) => Ok(NodeKind::Atom { text: atom.text }),
            (None, Some(scheme)) => {
                let kind = if scheme.support.is_some() {
                    Some(SchemeKind::Support)
                } else if scheme.attack.is_some() {
                    Some(SchemeKind::Attack)
                } else if scheme.rephrase.is_some() {
                    Some(SchemeKind::Rephrase)
                } else if scheme.preference.is_some() {
                    Some(SchemeKind::Preference)
                } else {
                    None
                };
                Ok(NodeKind::Scheme(kind))
            }
            _ => Err(GraphError::InvalidNode(id.to_string())),
        }
    }

    /// A graph holding a single claim and its source text.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim().to_string();
        let document = json!({
            "nodes": {"query": {"atom": {"text": text}}},
            "resources": {"query": {"text": text}},
        });

        Self {
            nodes: BTreeMap::from([("query".to_string(), NodeKind::Atom { text: text.clone() })]),
            edges: BTreeMap::new(),
            resources: BTreeMap::from([("query".to_string(), text)]),
            major_claim: None,
            userdata: Userdata::default(),
            document,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeKind> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeKind)> {
        self.nodes.iter().map(|(id, kind)| (id.as_str(), kind))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Atom nodes as `(id, text)`, ordered by id.
    pub fn atom_nodes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().filter_map(|(id, kind)| match kind {
            NodeKind::Atom { text } => Some((id.as_str(), text.as_str())),
            NodeKind::Scheme(_) => None,
        })
    }

    /// Scheme nodes ordered by id.
    pub fn scheme_nodes(&self) -> impl Iterator<Item = (&str, Option<SchemeKind>)> {
        self.nodes.iter().filter_map(|(id, kind)| match kind {
            NodeKind::Scheme(scheme) => Some((id.as_str(), *scheme)),
            NodeKind::Atom { .. } => None,
        })
    }

    /// Resource texts ordered by id.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.values().map(String::as_str)
    }

    /// Nodes with an edge pointing to `id`, ordered by id.
    pub fn incoming_nodes(&self, id: &str) -> Vec<&str> {
        let mut nodes: Vec<&str> = self
            .edges
            .values()
            .filter(|edge| edge.target == id)
            .map(|edge| edge.source.as_str())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Nodes that `id` points to, ordered by id.
    pub fn outgoing_nodes(&self, id: &str) -> Vec<&str> {
        let mut nodes: Vec<&str> = self
            .edges
            .values()
            .filter(|edge| edge.source == id)
            .map(|edge| edge.target.as_str())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// The major claim if it names an existing node.
    pub fn major_claim(&self) -> Option<&str> {
        self.major_claim
            .as_deref()
            .filter(|id| self.nodes.contains_key(*id))
    }

    /// The only atom node without outgoing edges, if there is exactly one.
    pub fn root_node(&self) -> Option<&str> {
        let mut roots = self
            .atom_nodes()
            .map(|(id, _)| id)
            .filter(|id| self.outgoing_nodes(id).is_empty());

        match (roots.next(), roots.next()) {
            (Some(root), None) => Some(root),
            _ => None,
        }
    }

    pub fn userdata(&self) -> &Userdata {
        &self.userdata
    }

    /// The benchmark used for evaluation (only the first one is evaluated).
    pub fn benchmark(&self) -> Option<&CbrEvaluation> {
        self.userdata.cbr_evaluations.first()
    }

    /// The wire representation: the document without userdata, plus its text.
    pub fn to_annotated_graph(
        &self,
        algorithm: Graph2TextAlgorithm,
    ) -> Result<AnnotatedGraph, GraphError> {
        let mut graph = self.document.clone();
        if let Value::Object(map) = &mut graph {
            map.remove("userdata");
        }

        Ok(AnnotatedGraph {
            graph,
            text: graph2text(self, algorithm)?,
        })
    }
}

/// Errors from graph loading and traversal.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse graph: {0}")]
    ParseError(String),

    #[error("Invalid userdata: {0}")]
    UserdataError(String),

    #[error("Unsupported graph format '{0}' (expected json or txt)")]
    UnsupportedFormat(String),

    #[error("Node '{0}' must be either an atom or a scheme")]
    InvalidNode(String),

    #[error("Edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },

    #[error("Graph has neither a major claim nor a unique root node")]
    NoStartNode,
}
