//! Attribute-based reference scan for HTML-like templates

use super::{clean_reference, push_unique};
use regex::Regex;
use std::sync::LazyLock;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(src|href|data-src|poster|action|srcset|data-main|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

/// Collect `src`/`href`-like attribute targets, in document order.
pub fn scan(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for caps in ATTRIBUTE.captures_iter(content) {
        let attr = caps[1].to_ascii_lowercase();
        let Some(value) = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
            continue;
        };
        match attr.as_str() {
            "srcset" => {
                for candidate in value.split(',') {
                    let url = candidate.split_whitespace().next().unwrap_or("");
                    if let Some(spec) = clean_reference(url) {
                        push_unique(&mut refs, spec);
                    }
                }
            }
            // <meta content="..."> is only a reference when it is shaped like a path.
            "content" => {
                if crate::shapes::looks_like_asset_path(value)
                    && crate::shapes::has_asset_extension(value)
                {
                    if let Some(spec) = clean_reference(value) {
                        push_unique(&mut refs, spec);
                    }
                }
            }
            _ => {
                if let Some(spec) = clean_reference(value) {
                    push_unique(&mut refs, spec);
                }
            }
        }
    }
    refs
}
