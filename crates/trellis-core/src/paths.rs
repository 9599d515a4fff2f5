//! Lexical path helpers: normalization, containment, node ids

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem.
/// A `..` that would climb above the root of an absolute path is dropped,
/// one above a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// True if `candidate` is `root` or lies underneath it, compared lexically
/// after normalization.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    normalize(candidate).starts_with(normalize(root))
}

/// Like [`is_within`], but when both paths exist also compares their
/// canonical forms, so a symlink pointing outside the root is rejected.
pub fn is_contained(root: &Path, candidate: &Path) -> bool {
    if !is_within(root, candidate) {
        return false;
    }
    match (std::fs::canonicalize(root), std::fs::canonicalize(candidate)) {
        (Ok(root), Ok(candidate)) => candidate.starts_with(root),
        _ => true,
    }
}

/// Root-relative, forward-slash id for `abs`. `None` when `abs` is outside
/// `root`; the root itself maps to `"."`.
pub fn node_id(root: &Path, abs: &Path) -> Option<String> {
    let rel = normalize(abs);
    let rel = rel.strip_prefix(normalize(root)).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Some(".".to_string());
    }
    let id = parts.join("/");
    if id.starts_with("..") {
        return None;
    }
    Some(id)
}

/// Lower-cased extension of `path`, if any.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// True for names starting with a dot (`.git`, `.env`).
pub fn is_dotfile(name: &str) -> bool {
    name.starts_with('.')
}
