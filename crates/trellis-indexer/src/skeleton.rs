//! Project skeleton synthesized when traversal finds almost nothing

use crate::expansion::list_dir;
use crate::extractor::{FileCategory, SourceExtractor};
use std::fs;
use std::path::Path;
use trellis_core::paths::{extension, is_contained, node_id};
use trellis_core::{LinkType, NodeKind, ProjectGraph};

/// Id of the synthetic root node.
pub const ROOT_ID: &str = ".";

/// Directory names that usually carry a project's structure.
pub const CONVENTIONAL_DIRS: &[&str] = &[
    "src", "lib", "app", "server", "client", "api", "routes", "controllers", "models",
    "services", "middleware", "utils", "components", "pages", "views", "templates", "public",
    "static", "assets", "config", "scripts", "bin", "test", "tests", "docs",
];

/// Extensions worth showing one level inside a conventional directory.
pub const SKELETON_EXTENSIONS: &[&str] = &[
    "js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts", "json", "html", "htm", "ejs", "hbs",
    "vue", "svelte", "css", "scss", "less", "md", "yml", "yaml", "toml",
];

/// Top-level manifest, lock, license, readme and config files.
pub const CONVENTION_FILES: &[&str] = &[
    "package.json", "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "tsconfig.json",
    "jsconfig.json", "README.md", "README", "LICENSE", "LICENSE.md", "Dockerfile",
    "docker-compose.yml", ".env.example", "nodemon.json", "vite.config.js", "vite.config.ts",
    "webpack.config.js", "next.config.js",
];

/// Add the skeleton to `graph`: a `root` node linked to the entry, to each
/// conventional directory present (plus up to `per_dir_cap` of its files)
/// and to each convention file present.
pub(crate) fn synthesize(
    graph: &mut ProjectGraph,
    extractor: &mut SourceExtractor,
    root: &Path,
    entry_id: &str,
    per_dir_cap: usize,
) {
    let (root_node, _) = graph.ensure_node(ROOT_ID, NodeKind::Root);
    root_node.file = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ROOT_ID.to_string());
    graph.set_kind(ROOT_ID, NodeKind::Root);
    graph.add_link(ROOT_ID, LinkType::Include, entry_id);

    for name in CONVENTIONAL_DIRS {
        let dir = root.join(name);
        if !dir.is_dir() || !is_contained(root, &dir) {
            continue;
        }
        let Some(dir_id) = node_id(root, &dir) else {
            continue;
        };
        graph.ensure_node(&dir_id, NodeKind::Dir);
        graph.add_link(ROOT_ID, LinkType::Include, &dir_id);

        let files = list_dir(&dir, usize::MAX)
            .into_iter()
            .filter(|p| p.is_file())
            .filter(|p| extension(p).is_some_and(|ext| SKELETON_EXTENSIONS.contains(&ext.as_str())))
            .take(per_dir_cap);
        for file in files {
            add_file(graph, extractor, root, &dir_id, &file);
        }
    }

    for name in CONVENTION_FILES {
        let file = root.join(name);
        if file.is_file() {
            add_file(graph, extractor, root, ROOT_ID, &file);
        }
    }
}

fn add_file(graph: &mut ProjectGraph, extractor: &mut SourceExtractor, root: &Path, parent_id: &str, file: &Path) {
    if !is_contained(root, file) {
        return;
    }
    let Some(id) = node_id(root, file) else {
        return;
    };
    let kind = if FileCategory::from_path(file).is_program() {
        NodeKind::File
    } else {
        NodeKind::Asset
    };
    let metrics = match fs::read(file) {
        Ok(bytes) => extractor.extract(&String::from_utf8_lossy(&bytes), file).metrics(),
        Err(err) => {
            tracing::debug!("Skeleton file {} unreadable: {}", file.display(), err);
            Default::default()
        }
    };
    let (node, _) = graph.ensure_node(&id, kind);
    node.absorb(&metrics);
    graph.add_link(parent_id, LinkType::Include, &id);
}
