//! Core data structures for the dependency graph payload

use serde::{Deserialize, Serialize};

/// Discriminates what a node stands for on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A file visited (or queued) as program source.
    File,
    Dir,
    /// A referenced file that is not program source (markup, image, config...).
    Asset,
    /// Synthetic project root created by the skeleton fallback.
    Root,
}

/// What kind of relationship a link represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// A resolved program-level import.
    Use,
    /// A structural or asset reference.
    Include,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Use => "use",
            LinkType::Include => "include",
        }
    }
}

/// Metrics produced by extraction, applied to a node when it is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetrics {
    pub lines: u32,
    pub complexity: u32,
    pub header_comment: String,
}

/// A single vertex: one file or directory of the analyzed project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Project-root-relative, forward-slash path. Unique key.
    pub id: String,
    /// Display label (base name).
    pub file: String,
    pub lines: u32,
    pub complexity: u32,
    pub header_comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
}

impl Node {
    /// A lightweight node with zeroed metrics.
    pub fn placeholder(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        let file = display_name(&id);
        Node {
            id,
            file,
            lines: 0,
            complexity: 0,
            header_comment: String::new(),
            kind: Some(kind),
        }
    }

    /// True while nothing but the id has been filled in.
    pub fn is_placeholder(&self) -> bool {
        self.lines == 0 && self.complexity == 0 && self.header_comment.is_empty()
    }

    /// Fill empty fields from `metrics`. Populated fields are never overwritten.
    pub fn absorb(&mut self, metrics: &NodeMetrics) {
        if self.lines == 0 {
            self.lines = metrics.lines;
        }
        if self.complexity == 0 {
            self.complexity = metrics.complexity;
        }
        if self.header_comment.is_empty() && !metrics.header_comment.is_empty() {
            self.header_comment = metrics.header_comment.clone();
        }
    }
}

/// Base name of a node id; `.` and empty ids keep their id.
pub fn display_name(id: &str) -> String {
    id.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(id)
        .to_string()
}

/// A directed, typed edge between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: LinkType,
}

/// Where the analyzed app appears to listen, when the entry file says so.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlInfo {
    pub port: u16,
    pub url: String,
    /// Filled in by an optional probe; never affects the graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reachable: Option<bool>,
}

impl UrlInfo {
    pub fn local(port: u16) -> Self {
        UrlInfo {
            port,
            url: format!("http://localhost:{port}"),
            reachable: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Node id of the entrypoint.
    pub entry: String,
    #[serde(default)]
    pub url_info: Option<UrlInfo>,
}

/// The emitted snapshot consumed by the visualization layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphPayload {
    pub meta: Meta,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphPayload {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_link(&self, source: &str, link_type: LinkType, target: &str) -> bool {
        self.links
            .iter()
            .any(|l| l.source == source && l.link_type == link_type && l.target == target)
    }
}
