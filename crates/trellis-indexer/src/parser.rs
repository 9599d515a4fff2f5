//! tree-sitter parsers for the program-source dialects
//!
//! Parsers are owned by one extractor and reused across files of a run.
//! Grammars are set lazily the first time a dialect is seen.

use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Language, Parser, Tree};

/// Program-source dialects with a structural parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDialect {
    JavaScript,
    TypeScript,
    Tsx,
}

impl SourceDialect {
    /// Determine dialect from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "js" | "mjs" | "cjs" | "jsx" => Some(SourceDialect::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceDialect::TypeScript),
            "tsx" => Some(SourceDialect::Tsx),
            _ => None,
        }
    }

    /// Get the tree-sitter language for this dialect
    pub fn language(&self) -> Language {
        match self {
            SourceDialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SourceDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// One parser per dialect, created on demand.
#[derive(Default)]
pub struct SourceParser {
    parsers: HashMap<SourceDialect, Parser>,
}

impl SourceParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `content`. Returns `None` when the grammar cannot be loaded or
    /// tree-sitter gives up; syntax errors still produce a tree.
    pub fn parse(&mut self, dialect: SourceDialect, content: &str) -> Option<Tree> {
        let parser = match self.parsers.entry(dialect) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let mut parser = Parser::new();
                if let Err(err) = parser.set_language(&dialect.language()) {
                    tracing::warn!("Failed to set {:?} grammar: {}", dialect, err);
                    return None;
                }
                e.insert(parser)
            }
        };
        parser.parse(content, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_path() {
        assert_eq!(SourceDialect::from_path(Path::new("a/server.js")), Some(SourceDialect::JavaScript));
        assert_eq!(SourceDialect::from_path(Path::new("a.CJS")), Some(SourceDialect::JavaScript));
        assert_eq!(SourceDialect::from_path(Path::new("a.mts")), Some(SourceDialect::TypeScript));
        assert_eq!(SourceDialect::from_path(Path::new("a.tsx")), Some(SourceDialect::Tsx));
        assert_eq!(SourceDialect::from_path(Path::new("a.css")), None);
    }

    #[test]
    fn test_parse_javascript() {
        let mut parser = SourceParser::new();
        let tree = parser
            .parse(SourceDialect::JavaScript, "const a = require('./b');\n")
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn test_parse_typescript_reuses_parser() {
        let mut parser = SourceParser::new();
        for _ in 0..2 {
            let tree = parser
                .parse(SourceDialect::TypeScript, "class MyClass { method(): void {} }")
                .unwrap();
            assert_eq!(tree.root_node().kind(), "program");
        }
        assert_eq!(parser.parsers.len(), 1);
    }
}
