//! `url(...)` and `@import` scan for stylesheets

use super::{clean_reference, push_unique};
use regex::Regex;
use std::sync::LazyLock;

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#).expect("valid url regex")
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@(?:import|use|forward)\s+(?:"([^"]+)"|'([^']+)')"#).expect("valid import regex")
});

pub fn scan(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for caps in IMPORT.captures_iter(content) {
        if let Some(spec) = caps.get(1).or_else(|| caps.get(2)).and_then(|m| clean_reference(m.as_str())) {
            push_unique(&mut refs, spec);
        }
    }
    for caps in URL.captures_iter(content) {
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");
        if let Some(spec) = clean_reference(raw) {
            push_unique(&mut refs, spec);
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_stylesheet() {
        let css = r#"@import "reset.css";
@import url('theme/dark.css');
body { background: url(/img/bg.png) no-repeat; }
@font-face { src: url("../fonts/inter.woff2?v=1") format("woff2"), url(data:font/woff;base64,AAAA); }
.logo { background-image: url( 'https://cdn.example.com/logo.svg' ); }
"#;
        assert_eq!(
            scan(css),
            vec!["reset.css", "theme/dark.css", "/img/bg.png", "../fonts/inter.woff2"]
        );
    }
}
