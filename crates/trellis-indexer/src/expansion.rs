//! Bounded directory listing used by directory expansion and the skeleton

use std::fs;
use std::path::{Path, PathBuf};
use trellis_core::paths::is_dotfile;

/// Dependency, VCS and build-artifact names never descended into.
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "out",
    "coverage",
    ".nyc_output",
    ".next",
    ".nuxt",
    ".cache",
    "target",
    "vendor",
    ".trellis",
];

/// True for entry names that expansion ignores.
pub fn is_skipped(name: &str) -> bool {
    is_dotfile(name) || SKIP_DIRS.contains(&name)
}

/// Entries of `dir` sorted by name, without skipped names, truncated to `cap`.
/// An unreadable directory lists as empty.
pub fn list_dir(dir: &Path, cap: usize) -> Vec<PathBuf> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(err) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), err);
            return Vec::new();
        }
    };
    let mut entries: Vec<PathBuf> = reader
        .filter_map(|entry| entry.ok())
        .filter(|entry| !is_skipped(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if entries.len() > cap {
        tracing::debug!("Truncating listing of {} to {} entries", dir.display(), cap);
        entries.truncate(cap);
    }
    entries
}
