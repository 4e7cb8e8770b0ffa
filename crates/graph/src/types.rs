use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Module-level dependency graph (edge `a -> b` means `a` imports `b`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "ImportGraphDocument", into = "ImportGraphDocument")]
pub struct ImportGraph {
    graph: DiGraph<String, ()>,
    module_index: HashMap<String, NodeIndex>,
}

/// Serialisable form of [`ImportGraph`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportGraphDocument {
    pub nodes: Vec<String>,
    pub out_edges: BTreeMap<String, Vec<String>>,
    pub in_edges: BTreeMap<String, Vec<String>>,
}

impl ImportGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module node (idempotent)
    pub fn add_module(&mut self, module: &str) -> NodeIndex {
        if let Some(idx) = self.module_index.get(module) {
            return *idx;
        }
        let idx = self.graph.add_node(module.to_string());
        self.module_index.insert(module.to_string(), idx);
        idx
    }

    /// Add an import edge; duplicates and self-edges are ignored
    pub fn add_import(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let a = self.add_module(from);
        let b = self.add_module(to);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.module_index.contains_key(module)
    }

    /// Modules imported by `module`, sorted
    #[must_use]
    pub fn out_edges(&self, module: &str) -> Vec<&str> {
        self.adjacent(module, Direction::Outgoing)
    }

    /// Modules importing `module`, sorted
    #[must_use]
    pub fn in_edges(&self, module: &str) -> Vec<&str> {
        self.adjacent(module, Direction::Incoming)
    }

    /// One-hop neighbours in both directions
    #[must_use]
    pub fn neighbors(&self, module: &str) -> BTreeSet<&str> {
        self.out_edges(module)
            .into_iter()
            .chain(self.in_edges(module))
            .collect()
    }

    fn adjacent(&self, module: &str, direction: Direction) -> Vec<&str> {
        let Some(idx) = self.module_index.get(module) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|edge| match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
            .map(|n| self.graph[n].as_str())
            .collect();
        out.sort_unstable();
        out
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn to_document(&self) -> ImportGraphDocument {
        let mut nodes: Vec<String> = self.module_index.keys().cloned().collect();
        nodes.sort();

        let mut out_edges = BTreeMap::new();
        let mut in_edges = BTreeMap::new();
        for module in &nodes {
            let outs = self.out_edges(module);
            if !outs.is_empty() {
                out_edges.insert(module.clone(), outs.iter().map(|s| s.to_string()).collect());
            }
            let ins = self.in_edges(module);
            if !ins.is_empty() {
                in_edges.insert(module.clone(), ins.iter().map(|s| s.to_string()).collect());
            }
        }

        ImportGraphDocument {
            nodes,
            out_edges,
            in_edges,
        }
    }
}

impl From<ImportGraphDocument> for ImportGraph {
    fn from(doc: ImportGraphDocument) -> Self {
        let mut graph = Self::new();
        for module in &doc.nodes {
            graph.add_module(module);
        }
        for (from, targets) in &doc.out_edges {
            for to in targets {
                graph.add_import(from, to);
            }
        }
        graph
    }
}

impl From<ImportGraph> for ImportGraphDocument {
    fn from(graph: ImportGraph) -> Self {
        graph.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edges_are_deduplicated_and_sorted() {
        let mut graph = ImportGraph::new();
        graph.add_import("app", "pkg.b");
        graph.add_import("app", "pkg.a");
        graph.add_import("app", "pkg.a");
        graph.add_import("app", "app");

        assert_eq!(graph.out_edges("app"), vec!["pkg.a", "pkg.b"]);
        assert_eq!(graph.in_edges("pkg.a"), vec!["app"]);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.out_edges("missing").is_empty());
    }

    #[test]
    fn document_round_trip_preserves_edges() {
        let mut graph = ImportGraph::new();
        graph.add_module("lonely");
        graph.add_import("a", "b");
        graph.add_import("c", "b");

        let json = serde_json::to_string(&graph).unwrap();
        let back: ImportGraph = serde_json::from_str(&json).unwrap();

        assert_eq!(back.to_document(), graph.to_document());
        assert!(back.contains("lonely"));
        assert_eq!(back.neighbors("b").into_iter().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
