// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Flatten argument graphs to plain text for the NLP side of the services.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::models::graph::{Graph, GraphError, NodeKind, SchemeKind};

/// Seed for the `RANDOM` ordering so runs are reproducible.
const RANDOM_SEED: u64 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Graph2TextAlgorithm {
    /// Atom texts ordered by node id
    #[default]
    #[serde(alias = "node_id")]
    NodeId,
    /// Texts of the source documents
    #[serde(alias = "original_resource")]
    OriginalResource,
    /// Atom texts in a shuffled (seeded) order
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "bfs")]
    Bfs,
    #[serde(alias = "dfs")]
    Dfs,
    /// Depth-first, with connectives for support and attack schemes
    #[serde(alias = "dfs_reconstruction")]
    DfsReconstruction,
}

/// Connective emitted for a scheme during reconstruction.
fn scheme_reconstruction(scheme: SchemeKind) -> Option<&'static str> {
    match scheme {
        SchemeKind::Support => Some("This is true because"),
        SchemeKind::Attack => Some("On the contrary,"),
        SchemeKind::Rephrase | SchemeKind::Preference => None,
    }
}

pub fn graph2text(graph: &Graph, algorithm: Graph2TextAlgorithm) -> Result<String, GraphError> {
    let text = match algorithm {
        Graph2TextAlgorithm::NodeId => join(graph.atom_nodes().map(|(_, text)| text)),
        Graph2TextAlgorithm::OriginalResource => join(graph.resources()),
        Graph2TextAlgorithm::Random => {
            let mut texts: Vec<&str> = graph.atom_nodes().map(|(_, text)| text).collect();
            let mut rng = StdRng::seed_from_u64(RANDOM_SEED);
            texts.shuffle(&mut rng);
            join(texts)
        }
        Graph2TextAlgorithm::Bfs => atom_texts(graph, &traverse_nodes(graph, Traversal::Bfs)?),
        Graph2TextAlgorithm::Dfs => atom_texts(graph, &traverse_nodes(graph, Traversal::Dfs)?),
        Graph2TextAlgorithm::DfsReconstruction => {
            let nodes = traverse_nodes(graph, Traversal::Dfs)?;
            join(nodes.iter().filter_map(|id| match graph.node(id) {
                Some(NodeKind::Atom { text }) => Some(text.as_str()),
                Some(NodeKind::Scheme(Some(scheme))) => scheme_reconstruction(*scheme),
                _ => None,
            }))
        }
    };

    Ok(text)
}

fn join<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    texts.into_iter().collect::<Vec<_>>().join(" ")
}

fn atom_texts(graph: &Graph, nodes: &[&str]) -> String {
    join(nodes.iter().filter_map(|id| match graph.node(id) {
        Some(NodeKind::Atom { text }) => Some(text.as_str()),
        _ => None,
    }))
}

#[derive(Clone, Copy)]
enum Traversal {
    Bfs,
    Dfs,
}

/// Everything leading to the start node (farthest first), the start node,
/// then everything the start node leads to.
fn traverse_nodes(graph: &Graph, traversal: Traversal) -> Result<Vec<&str>, GraphError> {
    let start = graph
        .major_claim()
        .or_else(|| graph.root_node())
        .ok_or(GraphError::NoStartNode)?;

    let incoming = traverse(start, |id| graph.incoming_nodes(id), traversal);
    let outgoing = traverse(start, |id| graph.outgoing_nodes(id), traversal);

    let mut nodes: Vec<&str> = incoming.into_iter().rev().collect();
    nodes.push(start);
    nodes.extend(outgoing);
    Ok(nodes)
}

/// Visit order of all nodes reachable from `start`, excluding `start`.
/// Neighbours are expanded in id order.
fn traverse<'g>(
    start: &'g str,
    connections: impl Fn(&str) -> Vec<&'g str>,
    traversal: Traversal,
) -> Vec<&'g str> {
    let mut visited: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    match traversal {
        Traversal::Dfs => {
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if seen.insert(node) {
                    visited.push(node);
                    // Reversed so the smallest id is expanded first
                    stack.extend(connections(node).into_iter().rev());
                }
            }
        }
        Traversal::Bfs => {
            let mut queue = VecDeque::from([start]);
            seen.insert(start);
            while let Some(node) = queue.pop_front() {
                visited.push(node);
                for next in connections(node) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
    }

    visited.into_iter().skip(1).collect()
}
