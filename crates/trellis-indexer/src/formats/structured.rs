//! Recursive key/value walk over JSON, YAML and TOML documents

use super::push_unique;
use crate::shapes::{is_remote, looks_like_asset_path, strip_query};
use serde_json::Value;

/// Structured-data syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Toml,
}

impl DataFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" | "jsonc" | "webmanifest" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            "toml" => Some(DataFormat::Toml),
            _ => None,
        }
    }
}

/// Key fragments whose string values are treated as references.
const PATH_KEY_FRAGMENTS: &[&str] = &[
    "path", "file", "dir", "folder", "root", "src", "entry", "main", "template", "static",
    "public", "asset", "include", "views", "icon", "image", "logo",
];

/// Parse `content` and collect path-like values. `None` when the document
/// does not parse, so the caller can fall back to a raw scan.
pub fn scan(content: &str, format: DataFormat) -> Option<Vec<String>> {
    let document: Value = match format {
        DataFormat::Json => serde_json::from_str(content).ok()?,
        DataFormat::Yaml => serde_yaml::from_str(content).ok()?,
        DataFormat::Toml => toml::from_str(content).ok()?,
    };
    let mut refs = Vec::new();
    walk(&document, None, &mut refs);
    Some(refs)
}

fn is_path_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    PATH_KEY_FRAGMENTS.iter().any(|fragment| key.contains(fragment))
}

/// Values under a path-like key only need to look like a single token.
fn plausible_under_path_key(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && value.len() <= 260
        && !is_remote(value)
        && !value.chars().any(char::is_whitespace)
        && !value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && !matches!(value, "true" | "false" | "null")
}

fn walk(value: &Value, key: Option<&str>, refs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let under_path_key = key.is_some_and(is_path_key) && plausible_under_path_key(s);
            if under_path_key || looks_like_asset_path(s) {
                push_unique(refs, strip_query(s.trim()).to_string());
            }
        }
        // Array items inherit the key of the array.
        Value::Array(items) => {
            for item in items {
                walk(item, key, refs);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                walk(v, Some(k), refs);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
