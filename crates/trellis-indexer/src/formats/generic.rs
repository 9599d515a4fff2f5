//! Fallback raw string-literal scan for files without a dedicated scanner

use super::push_unique;
use crate::shapes::{looks_like_asset_path, strip_query};
use regex::Regex;
use std::sync::LazyLock;

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]{2,260})"|'([^'\n]{2,260})'|`([^`\n]{2,260})`"#).expect("valid literal regex")
});

/// Quoted substrings shaped like in-project paths.
pub fn scan(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for caps in STRING_LITERAL.captures_iter(content) {
        let Some(literal) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        if looks_like_asset_path(literal.as_str()) {
            push_unique(&mut refs, strip_query(literal.as_str().trim()).to_string());
        }
    }
    refs
}
