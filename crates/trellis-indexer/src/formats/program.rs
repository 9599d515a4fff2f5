//! Structural extraction for JavaScript / TypeScript sources
//!
//! A single cursor walk collects import specifiers, branch counts, call
//! attribution, recognized path-building calls and path-shaped literals.
//! Top-level symbols are read from the program's direct children.

use super::push_unique;
use crate::attribution::{ANONYMOUS, AttributionStack};
use crate::call_shapes::{CallShape, CallSite, PathArg, PathRef, match_call};
use crate::extractor::{Symbol, SymbolKind};
use crate::shapes::{looks_like_asset_path, strip_query};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// Everything the structural walk produces for one file.
#[derive(Debug, Default)]
pub struct ProgramScan {
    pub imports: Vec<String>,
    pub complexity: u32,
    pub symbols: Vec<Symbol>,
    pub calls_by: BTreeMap<String, Vec<String>>,
    pub asset_refs: Vec<String>,
    pub file_refs_abs: Vec<PathBuf>,
    pub listen_port: Option<u16>,
}

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

const BRANCH_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "for_of_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
    "ternary_expression",
];

const SHORT_CIRCUIT_OPERATORS: &[&str] = &["&&", "||", "??"];

/// Walk a parsed (error-free) tree.
pub fn scan(tree: &Tree, source: &str, file_path: &Path) -> ProgramScan {
    let file_dir = file_path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut walker = Walker {
        src: source.as_bytes(),
        file_dir,
        stack: AttributionStack::new(),
        anchors: HashMap::new(),
        numbers: HashMap::new(),
        consumed: HashSet::new(),
        out: ProgramScan::default(),
    };
    let root = tree.root_node();
    walker.out.symbols = top_level_symbols(root, walker.src);
    walker.walk(root);

    let Walker { stack, mut out, .. } = walker;
    out.calls_by = stack.into_calls();
    out
}

struct Walker<'a> {
    src: &'a [u8],
    file_dir: PathBuf,
    stack: AttributionStack,
    /// Variables bound to an absolute directory, e.g. `const PUBLIC = path.join(__dirname, 'public')`.
    anchors: HashMap<String, PathBuf>,
    /// Variables bound to a port-like number.
    numbers: HashMap<String, u16>,
    /// Start bytes of string nodes already used as import specifiers.
    consumed: HashSet<usize>,
    out: ProgramScan,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, root: Node<'_>) {
        let mut cursor = root.walk();
        loop {
            self.enter(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                self.leave(cursor.node());
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.src).unwrap_or("")
    }

    fn enter(&mut self, node: Node<'_>) {
        let kind = node.kind();
        if FUNCTION_KINDS.contains(&kind) {
            let name = self.function_name(node);
            self.stack.push(name);
        }
        if BRANCH_KINDS.contains(&kind) {
            self.out.complexity += 1;
        }
        match kind {
            "import_statement" | "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    self.add_import(source);
                }
            }
            // TypeScript `import x = require('./y')`
            "import_require_clause" => {
                let mut cursor = node.walk();
                let source = node
                    .child_by_field_name("source")
                    .or_else(|| node.named_children(&mut cursor).find(|c| c.kind() == "string"));
                if let Some(source) = source {
                    self.add_import(source);
                }
            }
            "binary_expression" => {
                let is_logical = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| SHORT_CIRCUIT_OPERATORS.contains(&op.kind()));
                if is_logical {
                    self.out.complexity += 1;
                }
            }
            "call_expression" => self.visit_call(node),
            "variable_declarator" => self.capture_binding(node),
            "string" | "template_string" => {
                if !self.consumed.contains(&node.start_byte()) {
                    if let Some(value) = self.literal(node) {
                        if looks_like_asset_path(&value) {
                            push_unique(&mut self.out.asset_refs, strip_query(value.trim()).to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn leave(&mut self, node: Node<'_>) {
        if FUNCTION_KINDS.contains(&node.kind()) {
            self.stack.pop();
        }
    }

    fn add_import(&mut self, source: Node<'_>) {
        if let Some(spec) = self.literal(source) {
            self.consumed.insert(source.start_byte());
            if !spec.is_empty() {
                push_unique(&mut self.out.imports, spec);
            }
        }
    }

    /// String value of a `string`, or of a `template_string` without
    /// substitutions.
    fn literal(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => {
                let text = self.text(node);
                let inner = text.get(1..text.len().saturating_sub(1))?;
                Some(inner.to_string())
            }
            "template_string" => {
                let mut cursor = node.walk();
                let has_substitution = node
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution");
                if has_substitution {
                    return None;
                }
                let text = self.text(node);
                Some(text.get(1..text.len().saturating_sub(1))?.to_string())
            }
            _ => None,
        }
    }

    fn arguments<'t>(&self, call: Node<'t>) -> Vec<Node<'t>> {
        let Some(args) = call.child_by_field_name("arguments") else {
            return Vec::new();
        };
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect()
    }

    fn visit_call(&mut self, call: Node<'_>) {
        let Some(callee) = call.child_by_field_name("function") else {
            return;
        };
        let args = self.arguments(call);

        if callee.kind() == "import" || (callee.kind() == "identifier" && self.text(callee) == "require") {
            if let Some(first) = args.first() {
                self.add_import(*first);
            }
            return;
        }

        let Some(chain) = self.member_chain(callee) else {
            return;
        };
        self.stack.record_call(&chain.join("."));

        if self.out.listen_port.is_none() && chain.len() >= 2 && chain.last().is_some_and(|m| m == "listen") {
            self.out.listen_port = args.first().and_then(|a| self.numeric_value(*a));
        }

        let site = CallSite::new(chain, args.iter().map(|a| self.classify_arg(*a)).collect());
        match match_call(&site) {
            Some((shape, PathRef::Absolute(path))) => {
                tracing::trace!("{:?} call resolved to {}", shape, path.display());
                if !self.out.file_refs_abs.contains(&path) {
                    self.out.file_refs_abs.push(path);
                }
            }
            Some((_, PathRef::Relative(spec))) => push_unique(&mut self.out.asset_refs, spec),
            None => {}
        }
    }

    fn member_chain(&self, node: Node<'_>) -> Option<Vec<String>> {
        match node.kind() {
            "identifier" | "property_identifier" | "this" | "super" => Some(vec![self.text(node).to_string()]),
            "member_expression" => {
                let mut chain = self.member_chain(node.child_by_field_name("object")?)?;
                chain.push(self.text(node.child_by_field_name("property")?).to_string());
                Some(chain)
            }
            _ => None,
        }
    }

    fn classify_arg(&self, node: Node<'_>) -> PathArg {
        match node.kind() {
            "string" | "template_string" => self.literal(node).map(PathArg::Literal).unwrap_or(PathArg::Opaque),
            "identifier" => {
                let name = self.text(node);
                if name == "__dirname" {
                    PathArg::Anchor(self.file_dir.clone())
                } else {
                    self.anchors.get(name).cloned().map(PathArg::Anchor).unwrap_or(PathArg::Opaque)
                }
            }
            "member_expression" if self.text(node) == "import.meta.dirname" => PathArg::Anchor(self.file_dir.clone()),
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.classify_arg(inner),
                None => PathArg::Opaque,
            },
            "call_expression" => {
                let Some(chain) = node.child_by_field_name("function").and_then(|f| self.member_chain(f)) else {
                    return PathArg::Opaque;
                };
                let args = self.arguments(node).into_iter().map(|a| self.classify_arg(a)).collect();
                match match_call(&CallSite::new(chain, args)) {
                    Some((CallShape::PathJoin | CallShape::PathResolve, path)) => path.into_arg(),
                    _ => PathArg::Opaque,
                }
            }
            _ => PathArg::Opaque,
        }
    }

    fn numeric_value(&self, node: Node<'_>) -> Option<u16> {
        match node.kind() {
            "number" => self.text(node).parse().ok(),
            "string" => self.literal(node)?.parse().ok(),
            "identifier" => self.numbers.get(self.text(node)).copied(),
            "parenthesized_expression" => self.numeric_value(node.named_child(0)?),
            // `process.env.PORT || 3000`
            "binary_expression" => {
                let op = node.child_by_field_name("operator")?;
                if !SHORT_CIRCUIT_OPERATORS.contains(&op.kind()) {
                    return None;
                }
                self.numeric_value(node.child_by_field_name("right")?)
            }
            // `Number(x)`, `parseInt(x, 10)`
            "call_expression" => {
                let callee = self.text(node.child_by_field_name("function")?);
                if !matches!(callee, "Number" | "parseInt") {
                    return None;
                }
                self.numeric_value(*self.arguments(node).first()?)
            }
            _ => None,
        }
    }

    fn capture_binding(&mut self, declarator: Node<'_>) {
        let Some(name) = declarator.child_by_field_name("name") else {
            return;
        };
        if name.kind() != "identifier" {
            return;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            return;
        };
        let name = self.text(name).to_string();
        if let PathArg::Anchor(path) = self.classify_arg(value) {
            self.anchors.insert(name.clone(), path);
        }
        if let Some(port) = self.numeric_value(value) {
            self.numbers.insert(name, port);
        }
    }

    /// Name for a function frame: its own name, else the binding it is
    /// assigned to, else `<anonymous>`.
    fn function_name(&self, node: Node<'_>) -> String {
        if let Some(name) = node.child_by_field_name("name") {
            return self.text(name).to_string();
        }
        let Some(parent) = node.parent() else {
            return ANONYMOUS.to_string();
        };
        let inferred = match parent.kind() {
            "variable_declarator" => parent.child_by_field_name("name").map(|n| self.text(n).to_string()),
            "pair" => parent
                .child_by_field_name("key")
                .map(|k| self.text(k).trim_matches(|c| c == '"' || c == '\'').to_string()),
            "assignment_expression" => parent.child_by_field_name("left").map(|left| {
                match left.kind() {
                    "member_expression" => left
                        .child_by_field_name("property")
                        .map(|p| self.text(p).to_string())
                        .unwrap_or_default(),
                    _ => self.text(left).to_string(),
                }
            }),
            "public_field_definition" | "field_definition" => parent
                .child_by_field_name("name")
                .or_else(|| parent.child_by_field_name("property"))
                .map(|n| self.text(n).to_string()),
            _ => None,
        };
        inferred
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }
}

fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn is_function_value(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Declarations directly under the program node.
fn top_level_symbols(root: Node<'_>, src: &[u8]) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "export_statement" => export_symbols(child, src, &mut symbols),
            "expression_statement" => commonjs_export(child, src, &mut symbols),
            _ => declaration_symbols(child, src, false, &mut symbols),
        }
    }
    symbols
}

fn declaration_symbols(node: Node<'_>, src: &[u8], exported: bool, out: &mut Vec<Symbol>) {
    let named = |kind: SymbolKind| {
        node.child_by_field_name("name")
            .map(|n| Symbol::new(node_text(n, src), kind, exported))
    };
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            out.extend(named(SymbolKind::Function));
        }
        "class_declaration" | "abstract_class_declaration" => {
            out.extend(named(SymbolKind::Class));
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let (Some(name), Some(value)) = (
                    declarator.child_by_field_name("name"),
                    declarator.child_by_field_name("value"),
                ) else {
                    continue;
                };
                if is_function_value(value) {
                    out.push(Symbol::new(node_text(name, src), SymbolKind::ConstFunction, exported));
                }
            }
        }
        _ => {}
    }
}

fn export_symbols(node: Node<'_>, src: &[u8], out: &mut Vec<Symbol>) {
    let mut cursor = node.walk();
    let is_default = node.children(&mut cursor).any(|c| c.kind() == "default");

    if let Some(declaration) = node.child_by_field_name("declaration") {
        if is_default {
            let name = declaration
                .child_by_field_name("name")
                .map(|n| node_text(n, src))
                .unwrap_or("default");
            out.push(Symbol::new(name, SymbolKind::DefaultExport, true));
        } else {
            declaration_symbols(declaration, src, true, out);
        }
        return;
    }

    if is_default {
        let name = node
            .child_by_field_name("value")
            .and_then(|v| match v.kind() {
                "identifier" => Some(v),
                _ => v.child_by_field_name("name"),
            })
            .map(|n| node_text(n, src))
            .unwrap_or("default");
        out.push(Symbol::new(name, SymbolKind::DefaultExport, true));
        return;
    }

    let mut cursor = node.walk();
    for clause in node.named_children(&mut cursor) {
        if clause.kind() != "export_clause" {
            continue;
        }
        let mut inner = clause.walk();
        for spec in clause.named_children(&mut inner) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let exported = spec
                .child_by_field_name("alias")
                .or_else(|| spec.child_by_field_name("name"));
            if let Some(n) = exported {
                out.push(Symbol::new(node_text(n, src), SymbolKind::NamedExport, true));
            }
        }
    }
}

/// `module.exports = x` and `exports.name = x` / `module.exports.name = x`.
fn commonjs_export(statement: Node<'_>, src: &[u8], out: &mut Vec<Symbol>) {
    let Some(expr) = statement.named_child(0) else {
        return;
    };
    if expr.kind() != "assignment_expression" {
        return;
    }
    let Some(left) = expr.child_by_field_name("left") else {
        return;
    };
    let target = node_text(left, src);
    if target == "module.exports" {
        let name = expr
            .child_by_field_name("right")
            .filter(|r| r.kind() == "identifier")
            .map(|r| node_text(r, src))
            .unwrap_or("default");
        out.push(Symbol::new(name, SymbolKind::DefaultExport, true));
    } else if let Some(name) = target
        .strip_prefix("module.exports.")
        .or_else(|| target.strip_prefix("exports."))
    {
        out.push(Symbol::new(name, SymbolKind::NamedExport, true));
    }
}
