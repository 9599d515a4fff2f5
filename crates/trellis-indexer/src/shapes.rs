//! Shape rules for strings that look like in-project file or asset paths

use std::path::Path;

/// Extensions that mark a literal as a probable file reference.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts", "json", "html", "htm", "css", "scss",
    "sass", "less", "md", "markdown", "yml", "yaml", "toml", "txt", "xml", "csv", "ejs", "hbs",
    "pug", "njk", "vue", "svelte", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp",
    "avif", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "webm", "wav", "ogg", "pdf",
    "wasm", "map", "sql", "db", "sqlite",
];

/// Directory names that commonly prefix in-project paths.
pub const KNOWN_DIR_PREFIXES: &[&str] = &[
    "public", "static", "assets", "views", "templates", "routes", "config", "src", "lib",
    "app", "client", "server", "www", "web", "img", "images", "css", "js", "fonts", "media",
    "uploads", "data", "docs", "pages", "components",
];

/// Longest literal considered a path.
const MAX_PATH_LEN: usize = 260;

/// True for URLs and other strings that can never be local references.
pub fn is_remote(spec: &str) -> bool {
    let lower = spec.trim().to_ascii_lowercase();
    lower.contains("://")
        || lower.starts_with("//")
        || lower.starts_with('#')
        || ["data:", "mailto:", "tel:", "javascript:", "blob:", "about:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

/// Remove a `?query` or `#fragment` suffix.
pub fn strip_query(spec: &str) -> &str {
    let end = spec.find(['?', '#']).unwrap_or(spec.len());
    &spec[..end]
}

/// True if the literal's extension is in [`ASSET_EXTENSIONS`].
pub fn has_asset_extension(spec: &str) -> bool {
    Path::new(spec)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Conservative test for a string literal that names an in-project path:
/// a leading slash, a recognized extension, or a known directory prefix.
pub fn looks_like_asset_path(raw: &str) -> bool {
    let spec = strip_query(raw.trim());
    if spec.len() < 2 || spec.len() > MAX_PATH_LEN || is_remote(spec) {
        return false;
    }
    if spec.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '{' | '}' | '|' | '"' | '\'' | '`' | '*' | '$' | '\\' | ',' | ';' | '=')) {
        return false;
    }
    if let Some(rest) = spec.strip_prefix('/') {
        return rest
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    }
    if has_asset_extension(spec) {
        // Reject things like "v1.2" or "e.g" by requiring a non-empty stem.
        return Path::new(spec)
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| !s.is_empty() && s != ".");
    }
    let trimmed = spec.trim_start_matches("./");
    let first = trimmed.split('/').next().unwrap_or("");
    KNOWN_DIR_PREFIXES.contains(&first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_strings() {
        assert!(is_remote("https://cdn.example.com/x.js"));
        assert!(is_remote("//cdn.example.com/x.js"));
        assert!(is_remote("#top"));
        assert!(is_remote("data:image/png;base64,AAAA"));
        assert!(is_remote("mailto:a@b.c"));
        assert!(!is_remote("/css/site.css"));
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/app.js?v=3"), "/app.js");
        assert_eq!(strip_query("font.woff#iefix"), "font.woff");
        assert_eq!(strip_query("plain.css"), "plain.css");
    }

    #[test]
    fn test_asset_shapes() {
        assert!(looks_like_asset_path("/index.html"));
        assert!(looks_like_asset_path("/api/users"));
        assert!(looks_like_asset_path("logo.png"));
        assert!(looks_like_asset_path("public"));
        assert!(looks_like_asset_path("views/home.ejs"));
        assert!(looks_like_asset_path("./config/db"));
    }

    #[test]
    fn test_non_asset_shapes() {
        assert!(!looks_like_asset_path("hello world.txt"));
        assert!(!looks_like_asset_path("utf8"));
        assert!(!looks_like_asset_path("express"));
        assert!(!looks_like_asset_path("/"));
        assert!(!looks_like_asset_path("https://example.com/a.png"));
        assert!(!looks_like_asset_path("application/json"));
        assert!(!looks_like_asset_path("${base}/x.js"));
    }
}
