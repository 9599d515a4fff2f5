//! Insertion-ordered graph store backed by petgraph::StableDiGraph

use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};

/// The project graph under construction. Nodes are keyed by id and keep
/// insertion order; links are deduplicated by `(source, type, target)`.
pub struct ProjectGraph {
    inner: StableDiGraph<Node, LinkType>,
    index: HashMap<String, NodeIndex>,
    link_keys: HashSet<(NodeIndex, LinkType, NodeIndex)>,
}

impl std::fmt::Debug for ProjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectGraph")
            .field("node_count", &self.inner.node_count())
            .field("link_count", &self.inner.edge_count())
            .finish()
    }
}

impl ProjectGraph {
    pub fn new() -> Self {
        ProjectGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            link_keys: HashSet::new(),
        }
    }

    /// Return the node with `id`, creating a placeholder of `kind` if absent.
    /// The boolean is true when the node was created by this call.
    pub fn ensure_node(&mut self, id: &str, kind: NodeKind) -> (&mut Node, bool) {
        let (idx, created) = match self.index.get(id) {
            Some(&idx) => (idx, false),
            None => {
                let idx = self.inner.add_node(Node::placeholder(id, kind));
                self.index.insert(id.to_string(), idx);
                (idx, true)
            }
        };
        (&mut self.inner[idx], created)
    }

    /// Populate (or upgrade) a node visited as a primary source file.
    ///
    /// A placeholder `asset` becomes a `file`; a `dir` or `root` keeps its kind.
    /// Metrics only fill empty fields.
    pub fn upsert_source(&mut self, id: &str, metrics: &NodeMetrics) -> &Node {
        let (node, _) = self.ensure_node(id, NodeKind::File);
        if node.kind == Some(NodeKind::Asset) && node.is_placeholder() {
            node.kind = Some(NodeKind::File);
        }
        node.absorb(metrics);
        node
    }

    /// Change a node's kind. Returns false if the node does not exist.
    pub fn set_kind(&mut self, id: &str, kind: NodeKind) -> bool {
        match self.index.get(id) {
            Some(&idx) => {
                self.inner[idx].kind = Some(kind);
                true
            }
            None => false,
        }
    }

    /// Add a link between two existing nodes. Returns true if it was new.
    /// Self-loops and links to unknown ids are refused.
    pub fn add_link(&mut self, source: &str, link_type: LinkType, target: &str) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            tracing::trace!("refusing link {} -> {}: unknown endpoint", source, target);
            return false;
        };
        if s == t {
            return false;
        }
        if !self.link_keys.insert((s, link_type, t)) {
            return false;
        }
        self.inner.add_edge(s, t, link_type);
        true
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.inner[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn has_link(&self, source: &str, link_type: LinkType, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => self.link_keys.contains(&(s, link_type, t)),
            _ => false,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Links in insertion order.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.inner.edge_indices().filter_map(move |idx| {
            let (s, t) = self.inner.edge_endpoints(idx)?;
            Some(Link {
                source: self.inner[s].id.clone(),
                target: self.inner[t].id.clone(),
                link_type: *self.inner.edge_weight(idx)?,
            })
        })
    }

    /// Ids reachable from `start` by following links forward (including `start`).
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let Some(&idx) = self.index.get(start) else {
            return HashSet::new();
        };
        let mut reached = HashSet::new();
        let mut bfs = Bfs::new(&self.inner, idx);
        while let Some(next) = bfs.next(&self.inner) {
            reached.insert(self.inner[next].id.clone());
        }
        reached
    }

    /// Rebuild a store from a payload, e.g. a loaded snapshot.
    pub fn from_payload(payload: &GraphPayload) -> Self {
        let mut graph = ProjectGraph::new();
        for node in &payload.nodes {
            let (slot, _) = graph.ensure_node(&node.id, node.kind.unwrap_or(NodeKind::File));
            *slot = node.clone();
        }
        for link in &payload.links {
            graph.add_link(&link.source, link.link_type, &link.target);
        }
        graph
    }

    /// Freeze into the serializable payload.
    pub fn into_payload(self, meta: Meta) -> GraphPayload {
        let links = self.links().collect();
        let nodes = self.nodes().cloned().collect();
        GraphPayload { meta, nodes, links }
    }
}

impl Default for ProjectGraph {
    fn default() -> Self {
        Self::new()
    }
}
