//! Source Extractor: one extraction record per file, dispatched by category

use crate::formats::{generic, markup, program, prose, structured, stylesheet};
use crate::header::{count_lines, header_comment};
use crate::parser::{SourceDialect, SourceParser};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use trellis_core::NodeMetrics;
use trellis_core::paths::extension;

/// File categories recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Program,
    Markup,
    Stylesheet,
    StructuredData,
    Prose,
    Other,
}

impl FileCategory {
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = extension(path) else {
            return FileCategory::Other;
        };
        match ext.as_str() {
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "mts" | "cts" | "tsx" => FileCategory::Program,
            "html" | "htm" | "ejs" | "hbs" | "handlebars" | "njk" | "vue" | "svelte" => FileCategory::Markup,
            "css" | "scss" | "sass" | "less" => FileCategory::Stylesheet,
            "json" | "jsonc" | "webmanifest" | "yaml" | "yml" | "toml" => FileCategory::StructuredData,
            "md" | "markdown" | "mdx" => FileCategory::Prose,
            _ => FileCategory::Other,
        }
    }

    pub fn is_program(&self) -> bool {
        matches!(self, FileCategory::Program)
    }

    /// Text formats scanned for references but never traversed as sources.
    pub fn is_lightweight_text(&self) -> bool {
        matches!(
            self,
            FileCategory::Markup | FileCategory::Stylesheet | FileCategory::StructuredData | FileCategory::Prose
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Function,
    Class,
    ConstFunction,
    NamedExport,
    DefaultExport,
}

/// A top-level declaration or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub exported: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, exported: bool) -> Self {
        Symbol {
            name: name.into(),
            kind,
            exported,
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Module specifiers exactly as written, first-seen order.
    pub imports: Vec<String>,
    pub lines: u32,
    pub complexity: u32,
    pub header_comment: String,
    /// Secondary references still to be resolved against the file and root.
    pub asset_refs: Vec<String>,
    /// Secondary references already anchored to an absolute path.
    pub file_refs_abs: Vec<PathBuf>,
    pub symbols: Vec<Symbol>,
    /// Callee names keyed by enclosing function.
    pub calls_by: BTreeMap<String, Vec<String>>,
    /// Port passed to a `.listen(...)` call, when statically known.
    pub listen_port: Option<u16>,
}

impl Extraction {
    fn text_only(content: &str) -> Self {
        Extraction {
            lines: count_lines(content),
            header_comment: header_comment(content),
            ..Default::default()
        }
    }

    pub fn metrics(&self) -> NodeMetrics {
        NodeMetrics {
            lines: self.lines,
            complexity: self.complexity,
            header_comment: self.header_comment.clone(),
        }
    }
}

/// Extracts records from raw file content. Owns the tree-sitter parsers so
/// they are reused across one build.
#[derive(Default)]
pub struct SourceExtractor {
    parser: SourceParser,
}

impl SourceExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract a record from `content`. Never fails: unparseable input
    /// degrades to line count and header comment.
    pub fn extract(&mut self, content: &str, path: &Path) -> Extraction {
        let mut record = Extraction::text_only(content);
        match FileCategory::from_path(path) {
            FileCategory::Program => self.extract_program(content, path, &mut record),
            FileCategory::Markup => record.asset_refs = markup::scan(content),
            FileCategory::Stylesheet => record.asset_refs = stylesheet::scan(content),
            FileCategory::StructuredData => {
                let format = extension(path).and_then(|ext| structured::DataFormat::from_extension(&ext));
                record.asset_refs = format
                    .and_then(|f| structured::scan(content, f))
                    .unwrap_or_else(|| generic::scan(content));
            }
            FileCategory::Prose => record.asset_refs = prose::scan(content),
            FileCategory::Other => record.asset_refs = generic::scan(content),
        }
        record
    }

    fn extract_program(&mut self, content: &str, path: &Path, record: &mut Extraction) {
        let Some(dialect) = SourceDialect::from_path(path) else {
            return;
        };
        let Some(tree) = self.parser.parse(dialect, content) else {
            tracing::debug!("No syntax tree for {}", path.display());
            return;
        };
        if tree.root_node().has_error() {
            tracing::debug!("Syntax errors in {}, keeping text metrics only", path.display());
            return;
        }
        let scan = program::scan(&tree, content, path);
        record.imports = scan.imports;
        record.complexity = scan.complexity;
        record.symbols = scan.symbols;
        record.calls_by = scan.calls_by;
        record.asset_refs = scan.asset_refs;
        record.file_refs_abs = scan.file_refs_abs;
        record.listen_port = scan.listen_port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str, path: &str) -> Extraction {
        SourceExtractor::new().extract(content, Path::new(path))
    }

    #[test]
    fn test_file_category() {
        assert_eq!(FileCategory::from_path(Path::new("a/b.tsx")), FileCategory::Program);
        assert_eq!(FileCategory::from_path(Path::new("index.EJS")), FileCategory::Markup);
        assert_eq!(FileCategory::from_path(Path::new("x.scss")), FileCategory::Stylesheet);
        assert_eq!(FileCategory::from_path(Path::new("site.webmanifest")), FileCategory::StructuredData);
        assert_eq!(FileCategory::from_path(Path::new("README.md")), FileCategory::Prose);
        assert_eq!(FileCategory::from_path(Path::new("Dockerfile")), FileCategory::Other);
        assert!(FileCategory::Prose.is_lightweight_text());
        assert!(!FileCategory::Program.is_lightweight_text());
    }

    #[test]
    fn test_imports_in_first_seen_order() {
        let src = r#"
import express from 'express';
import { a } from './a.js';
export { b } from "./b";
const c = require('./c');
const again = require('./a.js');
async function lazy() { return import('./d.mjs'); }
"#;
        let record = extract(src, "/p/server.js");
        assert_eq!(record.imports, vec!["express", "./a.js", "./b", "./c", "./d.mjs"]);
        assert!(record.asset_refs.is_empty(), "import sources are not assets: {:?}", record.asset_refs);
    }

    #[test]
    fn test_complexity_counts_branches() {
        let src = r#"
function f(x, y) {
  if (x) { return 1; }
  for (let i = 0; i < 3; i++) {}
  for (const k of y) {}
  while (x) { x--; }
  do { y++; } while (y < 2);
  switch (x) { case 1: break; case 2: break; default: break; }
  try { g(); } catch (e) {}
  const z = x ? 1 : 2;
  return (x && y) || (z ?? 0);
}
"#;
        // if, for, for-of, while, do, 2 cases, catch, ternary, &&, ||, ??
        assert_eq!(extract(src, "f.js").complexity, 12);
    }

    #[test]
    fn test_symbols() {
        let src = r#"
export function handler() {}
export default class App {}
class Internal {}
const helper = () => 1;
export const format = function () {};
const value = 3;
function* gen() {}
export { helper as util };
"#;
        let record = extract(src, "mod.js");
        let names: Vec<(&str, SymbolKind, bool)> = record
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind, s.exported))
            .collect();
        assert_eq!(
            names,
            vec![
                ("handler", SymbolKind::Function, true),
                ("App", SymbolKind::DefaultExport, true),
                ("Internal", SymbolKind::Class, false),
                ("helper", SymbolKind::ConstFunction, false),
                ("format", SymbolKind::ConstFunction, true),
                ("gen", SymbolKind::Function, false),
                ("util", SymbolKind::NamedExport, true),
            ]
        );
    }

    #[test]
    fn test_commonjs_exports() {
        let src = "function run() {}\nmodule.exports = run;\nexports.extra = 1;\n";
        let record = extract(src, "cjs.js");
        assert!(record.symbols.contains(&Symbol::new("run", SymbolKind::DefaultExport, true)));
        assert!(record.symbols.contains(&Symbol::new("extra", SymbolKind::NamedExport, true)));
    }

    #[test]
    fn test_call_attribution() {
        let src = r#"
setup();
function start() { listen(); log.info('x'); }
const stop = () => { close(); };
const api = { fetch: function () { request(); } };
app.get('/', function () { render(); });
"#;
        let calls = extract(src, "a.js").calls_by;
        assert_eq!(calls["<module>"], vec!["setup", "app.get"]);
        assert_eq!(calls["start"], vec!["listen", "log.info"]);
        assert_eq!(calls["stop"], vec!["close"]);
        assert_eq!(calls["fetch"], vec!["request"]);
        assert_eq!(calls["<anonymous>"], vec!["render"]);
    }

    #[test]
    fn test_anchored_path_calls() {
        let src = r#"
const path = require('path');
const express = require('express');
const PUBLIC = path.join(__dirname, 'public');
app.use(express.static(PUBLIC));
app.get('/', (req, res) => res.sendFile(path.join(__dirname, '..', 'views', 'index.html')));
const cfg = fs.readFileSync(path.resolve(__dirname, 'config.json'));
fs.readFileSync(path.join(__dirname, someVar));
app.use(express.static('assets'));
"#;
        let record = extract(src, "/srv/app/server.js");
        assert!(record.file_refs_abs.contains(&PathBuf::from("/srv/app/public")));
        assert!(record.file_refs_abs.contains(&PathBuf::from("/srv/views/index.html")));
        assert!(record.file_refs_abs.contains(&PathBuf::from("/srv/app/config.json")));
        assert!(record.asset_refs.contains(&"assets".to_string()));
        assert!(!record.imports.is_empty());
    }

    #[test]
    fn test_raw_literal_scan() {
        let src = r#"
const logo = "/img/logo.png";
const greeting = "hello world";
const tpl = `views/home.ejs`;
const dynamic = `views/${name}.ejs`;
"#;
        let record = extract(src, "x.js");
        assert_eq!(record.asset_refs, vec!["/img/logo.png", "views/home.ejs"]);
    }

    #[test]
    fn test_listen_port() {
        assert_eq!(extract("app.listen(3000);", "s.js").listen_port, Some(3000));
        assert_eq!(
            extract("const PORT = process.env.PORT || 8080;\nserver.listen(PORT);", "s.js").listen_port,
            Some(8080)
        );
        assert_eq!(extract("app.listen(port);", "s.js").listen_port, None);
    }

    #[test]
    fn test_syntax_error_degrades_to_text_fields() {
        let src = "// Broken module\nimport { from './x';\nfunction (\n";
        let record = extract(src, "broken.js");
        assert_eq!(record.lines, 3);
        assert_eq!(record.header_comment, "Broken module");
        assert!(record.imports.is_empty());
        assert_eq!(record.complexity, 0);
        assert!(record.symbols.is_empty());
    }

    #[test]
    fn test_typescript_imports() {
        let src = "import type { A } from './types';\nimport b = require('./legacy');\nexport const f = (x: number): number => x;\n";
        let record = extract(src, "m.ts");
        assert_eq!(record.imports, vec!["./types", "./legacy"]);
        assert_eq!(record.symbols, vec![Symbol::new("f", SymbolKind::ConstFunction, true)]);
    }

    #[test]
    fn test_non_program_dispatch() {
        let html = extract(r#"<link href="/css/site.css"><script src="app.js"></script>"#, "index.html");
        assert_eq!(html.asset_refs, vec!["/css/site.css", "app.js"]);
        assert!(html.imports.is_empty());

        let broken_json = extract("{ \"main\": \"server.js\", ", "package.json");
        assert_eq!(broken_json.asset_refs, vec!["server.js"]);
    }
}
