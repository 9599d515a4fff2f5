//! Path denylist and consumer-side stale-notice filtering

use crate::event::ChangeNotice;
use std::path::{Component, Path};
use trellis_core::OUTPUT_DIR;

/// Path components that are never reported.
pub const IGNORED_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "coverage",
    ".next",
    ".cache",
    "target",
    OUTPUT_DIR,
];

/// True if any component of `path` below `root` is on the denylist.
pub fn is_ignored(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| match component {
        Component::Normal(name) => name.to_str().is_some_and(|n| IGNORED_NAMES.contains(&n)),
        _ => false,
    })
}

/// Keeps only notices carrying the run token a consumer last observed.
/// Notices from an earlier (or later) run are dropped.
#[derive(Debug, Clone, Default)]
pub struct RunTokenFilter {
    observed: Option<String>,
}

impl RunTokenFilter {
    pub fn new(observed: impl Into<String>) -> Self {
        RunTokenFilter {
            observed: Some(observed.into()),
        }
    }

    pub fn observe(&mut self, token: impl Into<String>) {
        self.observed = Some(token.into());
    }

    pub fn observed(&self) -> Option<&str> {
        self.observed.as_deref()
    }

    pub fn accepts(&self, notice: &ChangeNotice) -> bool {
        self.observed.as_deref() == Some(notice.run_token())
    }
}
