//! Change records delivered to subscribers

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
}

/// A settled filesystem change, relative to the watched root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub id: String,
    pub ev: ChangeKind,
    /// Epoch milliseconds.
    pub at: i64,
    pub run_token: String,
}

impl ChangeEvent {
    pub fn now(id: impl Into<String>, ev: ChangeKind, run_token: impl Into<String>) -> Self {
        ChangeEvent {
            id: id.into(),
            ev,
            at: chrono::Utc::now().timestamp_millis(),
            run_token: run_token.into(),
        }
    }
}

/// Everything a subscriber can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeNotice {
    Fs(ChangeEvent),
    WatchError {
        message: String,
        #[serde(rename = "runToken")]
        run_token: String,
    },
}

impl ChangeNotice {
    pub fn watch_error(message: impl Into<String>, run_token: impl Into<String>) -> Self {
        ChangeNotice::WatchError {
            message: message.into(),
            run_token: run_token.into(),
        }
    }

    pub fn run_token(&self) -> &str {
        match self {
            ChangeNotice::Fs(event) => &event.run_token,
            ChangeNotice::WatchError { run_token, .. } => run_token,
        }
    }
}

fn add_kind(path: &Path) -> ChangeKind {
    if path.is_dir() { ChangeKind::AddDir } else { ChangeKind::Add }
}

/// Map a backend event to `(path, kind)` pairs. Access and metadata-only
/// events on directories yield nothing.
pub fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let each = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> { event.paths.iter().map(|p| (p.clone(), kind)).collect() };
    match event.kind {
        EventKind::Create(CreateKind::Folder) => each(ChangeKind::AddDir),
        EventKind::Create(_) => event.paths.iter().map(|p| (p.clone(), add_kind(p))).collect(),
        EventKind::Remove(RemoveKind::Folder) => each(ChangeKind::UnlinkDir),
        EventKind::Remove(_) => each(ChangeKind::Unlink),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to]) => vec![(from.clone(), ChangeKind::Unlink), (to.clone(), add_kind(to))],
            (RenameMode::From, _) => each(ChangeKind::Unlink),
            (RenameMode::To, _) => event.paths.iter().map(|p| (p.clone(), add_kind(p))).collect(),
            _ => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() { add_kind(p) } else { ChangeKind::Unlink };
                    (p.clone(), kind)
                })
                .collect(),
        },
        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| (p.clone(), ChangeKind::Change))
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
