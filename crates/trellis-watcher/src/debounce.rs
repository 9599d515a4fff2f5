//! Per-path write settling

use crate::event::ChangeKind;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Holds raw changes until their path has been quiet for `quiet`.
/// Repeated changes to one path collapse into a single settled change.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, Pending>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: ChangeKind,
    last_seen: Instant,
}

/// Combine a pending change with a newer one. `None` means the two cancel.
fn merge(earlier: ChangeKind, later: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (earlier, later) {
        (Add, Change) => Some(Add),
        (Add, Unlink) | (AddDir, UnlinkDir) => None,
        (Unlink, Add) => Some(Change),
        (_, later) => Some(later),
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Debouncer {
            quiet,
            pending: HashMap::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        let merged = match self.pending.get(&path) {
            Some(existing) => merge(existing.kind, kind),
            None => Some(kind),
        };
        match merged {
            Some(kind) => {
                self.pending.insert(path, Pending { kind, last_seen: now });
            }
            None => {
                self.pending.remove(&path);
            }
        }
    }

    /// When the earliest pending path settles.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.last_seen + self.quiet).min()
    }

    /// Remove and return every change that has been quiet long enough,
    /// ordered by path.
    pub fn drain_settled(&mut self, now: Instant) -> Vec<(PathBuf, ChangeKind)> {
        let quiet = self.quiet;
        let mut settled: Vec<(PathBuf, ChangeKind)> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_seen) >= quiet)
            .map(|(path, p)| (path.clone(), p.kind))
            .collect();
        for (path, _) in &settled {
            self.pending.remove(path);
        }
        settled.sort_by(|a, b| a.0.cmp(&b.0));
        settled
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
