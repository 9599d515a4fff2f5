//! Reference Resolver: raw specifier to an existing in-project path
//!
//! Resolution is deterministic and touches the filesystem only for existence
//! checks. Every accepted candidate passes the containment rule of
//! [`trellis_core::paths::is_contained`].

use crate::shapes::{is_remote, strip_query};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use trellis_core::paths::{is_contained, is_within, normalize};

/// Directories tried, in order, for root-absolute specifiers like `/app.js`.
pub const PUBLIC_ROOTS: &[&str] = &["public", "static", "assets", "www", "client", "web"];

/// Extensions appended to extensionless import specifiers, in order.
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts", "json"];

fn is_relative(spec: &str) -> bool {
    spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
}

fn importer_dir(from: &Path) -> &Path {
    from.parent().unwrap_or(from)
}

/// Root-absolute candidates: each public root, then the project root.
fn rooted_bases(spec: &str, root: &Path) -> Vec<PathBuf> {
    let rest = spec.trim_start_matches('/');
    PUBLIC_ROOTS
        .iter()
        .map(|public| root.join(public).join(rest))
        .chain(std::iter::once(root.join(rest)))
        .collect()
}

/// Resolve an import specifier found in `from`. Returns `None` for bare
/// (package) specifiers, remote URLs, missing targets and anything that
/// would land outside `root`.
pub fn resolve(from: &Path, spec: &str, root: &Path) -> Option<PathBuf> {
    let spec = strip_query(spec.trim());
    if spec.is_empty() || is_remote(spec) {
        return None;
    }
    let bases = if is_relative(spec) {
        vec![importer_dir(from).join(spec)]
    } else if spec.starts_with('/') {
        rooted_bases(spec, root)
    } else {
        return None;
    };
    bases.into_iter().find_map(|base| probe_module(&base, root))
}

/// Candidate order: the literal file (when it has an extension), the path
/// with each known extension appended, then `index.<ext>` inside it.
fn probe_module(base: &Path, root: &Path) -> Option<PathBuf> {
    let base = normalize(base);
    if !is_within(root, &base) {
        tracing::trace!("rejecting {}: outside project root", base.display());
        return None;
    }

    let mut candidates = Vec::with_capacity(RESOLVE_EXTENSIONS.len() * 2 + 1);
    if base.extension().is_some() {
        candidates.push(base.clone());
    }
    candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| {
        let mut with_ext = OsString::from(base.as_os_str());
        with_ext.push(".");
        with_ext.push(ext);
        PathBuf::from(with_ext)
    }));
    if base.is_dir() {
        candidates.extend(RESOLVE_EXTENSIONS.iter().map(|ext| base.join(format!("index.{ext}"))));
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file() && is_contained(root, candidate))
}

/// Resolve a secondary (asset or structural) reference. Unlike [`resolve`]
/// this accepts directories and tries bare paths against both the importer's
/// directory and the project root.
pub fn resolve_reference(from: &Path, spec: &str, root: &Path) -> Option<PathBuf> {
    let spec = strip_query(spec.trim());
    if spec.is_empty() || is_remote(spec) {
        return None;
    }
    let bases = if spec.starts_with('/') {
        rooted_bases(spec, root)
    } else if is_relative(spec) {
        vec![importer_dir(from).join(spec)]
    } else {
        vec![importer_dir(from).join(spec), root.join(spec)]
    };
    bases.into_iter().find_map(|base| accept_existing(&base, root))
}

/// Accept an already-absolute path if it exists and is contained in `root`.
pub fn accept_existing(path: &Path, root: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    (path.exists() && is_contained(root, &path)).then_some(path)
}
