//! Link and image targets in Markdown

use super::{clean_reference, push_unique};
use regex::Regex;
use std::sync::LazyLock;

static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!?\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#)
        .expect("valid link regex")
});

static REFERENCE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s{0,3}\[[^\]]+\]:\s*<?(\S+?)>?(?:\s+.*)?$"#).expect("valid reference regex"));

static HTML_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img[^>]*\ssrc\s*=\s*["']([^"']+)["']"#).expect("valid img regex"));

pub fn scan(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let patterns: [&Regex; 3] = [&*INLINE_LINK, &*REFERENCE_LINK, &*HTML_SRC];
    for pattern in patterns {
        for caps in pattern.captures_iter(content) {
            if let Some(spec) = clean_reference(&caps[1]) {
                push_unique(&mut refs, spec);
            }
        }
    }
    refs
}
