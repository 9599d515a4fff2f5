//! Per-category reference scanners

pub mod generic;
pub mod markup;
pub mod program;
pub mod prose;
pub mod structured;
pub mod stylesheet;

use crate::shapes::{is_remote, strip_query};

/// Clean a raw reference found in markup, stylesheets or prose. Returns
/// `None` for remote URLs and empty targets.
pub(crate) fn clean_reference(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || is_remote(raw) {
        return None;
    }
    let spec = strip_query(raw).trim();
    if spec.is_empty() || spec.contains("{{") || spec.contains("<%") {
        return None;
    }
    Some(spec.to_string())
}

/// Append `spec` unless already present.
pub(crate) fn push_unique(out: &mut Vec<String>, spec: String) {
    if !out.contains(&spec) {
        out.push(spec);
    }
}
