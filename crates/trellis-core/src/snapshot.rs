//! Persistence of the single emitted graph snapshot

use crate::model::GraphPayload;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output directory: .trellis/
pub const OUTPUT_DIR: &str = ".trellis";

/// Snapshot file inside the output directory
pub const SNAPSHOT_FILE: &str = "graph.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Get output directory path
pub fn output_dir(root: &Path) -> PathBuf {
    root.join(OUTPUT_DIR)
}

/// Get snapshot file path
pub fn snapshot_path(root: &Path) -> PathBuf {
    output_dir(root).join(SNAPSHOT_FILE)
}

/// Write `payload` as pretty JSON to `path`, replacing any previous snapshot.
pub fn write_snapshot(payload: &GraphPayload, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, json).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Graph snapshot saved: {}", path.display());
    Ok(())
}

/// Persist `payload` under `<root>/.trellis/graph.json`.
pub fn save_snapshot(payload: &GraphPayload, root: &Path) -> Result<PathBuf, SnapshotError> {
    let path = snapshot_path(root);
    write_snapshot(payload, &path)?;
    Ok(path)
}

/// Load the last snapshot, if one was written.
pub fn load_snapshot(root: &Path) -> Option<GraphPayload> {
    let path = snapshot_path(root);
    let json = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&json) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot {}: {}", path.display(), e);
            None
        }
    }
}
