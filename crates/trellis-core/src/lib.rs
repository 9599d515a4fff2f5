//! Trellis Core: graph payload model, ordered graph store, path rules

pub mod graph;
pub mod model;
pub mod paths;
pub mod snapshot;

#[cfg(test)]
pub mod tests;

pub use graph::ProjectGraph;
pub use model::{GraphPayload, Link, LinkType, Meta, Node, NodeKind, NodeMetrics, UrlInfo};
pub use snapshot::{OUTPUT_DIR, SNAPSHOT_FILE, SnapshotError, load_snapshot, save_snapshot, snapshot_path, write_snapshot};
