//! Graph Builder: entrypoint-driven breadth-first traversal
//!
//! The builder is a pure function of `(root, entry)` plus the filesystem.
//! All traversal state lives in a [`Traversal`] created per run and dropped
//! when the payload is returned.

use crate::expansion::list_dir;
use crate::extractor::{Extraction, FileCategory, SourceExtractor};
use crate::resolver::{accept_existing, resolve, resolve_reference};
use crate::skeleton;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use trellis_core::paths::{node_id, normalize};
use trellis_core::{GraphPayload, LinkType, Meta, NodeKind, ProjectGraph, UrlInfo};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot read entrypoint {}: {source}", path.display())]
    EntrypointUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("entrypoint {} is outside project root {}", entry.display(), root.display())]
    EntrypointOutsideRoot { root: PathBuf, entry: PathBuf },
}

/// Sparse-graph trigger for the skeleton fallback. A graph with at most
/// `max_nodes` nodes and at most `max_links` links is considered sparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoModeThreshold {
    pub max_nodes: usize,
    pub max_links: usize,
}

impl Default for AutoModeThreshold {
    fn default() -> Self {
        AutoModeThreshold {
            max_nodes: 1,
            max_links: 1,
        }
    }
}

impl AutoModeThreshold {
    pub fn is_sparse(&self, nodes: usize, links: usize) -> bool {
        nodes <= self.max_nodes && links <= self.max_links
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub auto_mode: AutoModeThreshold,
    /// Entries kept per expanded directory.
    pub max_dir_entries: usize,
    /// Nesting levels of directory expansion below a referenced directory.
    pub max_dir_depth: usize,
    /// Files shown per conventional directory in the skeleton.
    pub skeleton_files_per_dir: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            auto_mode: AutoModeThreshold::default(),
            max_dir_entries: 200,
            max_dir_depth: 3,
            skeleton_files_per_dir: 25,
        }
    }
}

pub struct GraphBuilder {
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(options: BuildOptions) -> Self {
        GraphBuilder { options }
    }

    /// Build the graph reachable from `entry`. A relative `entry` is taken
    /// relative to `root`. Only an unreadable entrypoint is fatal.
    pub fn build(&self, root: &Path, entry: &Path) -> Result<GraphPayload, BuildError> {
        let started = Instant::now();
        let root = fs::canonicalize(root).unwrap_or_else(|_| normalize(root));
        let entry = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            root.join(entry)
        };
        let content = fs::read(&entry)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|source| BuildError::EntrypointUnreadable {
                path: entry.clone(),
                source,
            })?;
        let entry = fs::canonicalize(&entry).unwrap_or_else(|_| normalize(&entry));
        let entry_id = node_id(&root, &entry).ok_or_else(|| BuildError::EntrypointOutsideRoot {
            root: root.clone(),
            entry: entry.clone(),
        })?;

        let mut traversal = Traversal::new(&root, &self.options);
        traversal.visited.insert(entry.clone());
        let entry_record = traversal.visit(&entry, &content);
        traversal.drain();

        let Traversal {
            mut graph,
            mut extractor,
            ..
        } = traversal;

        if self.options.auto_mode.is_sparse(graph.node_count(), graph.link_count()) {
            tracing::info!(
                "Sparse graph ({} nodes, {} links), adding project skeleton",
                graph.node_count(),
                graph.link_count()
            );
            skeleton::synthesize(
                &mut graph,
                &mut extractor,
                &root,
                &entry_id,
                self.options.skeleton_files_per_dir,
            );
        }

        tracing::info!(
            "Built graph for {} in {:?}: {} nodes, {} links",
            entry_id,
            started.elapsed(),
            graph.node_count(),
            graph.link_count()
        );

        let meta = Meta {
            entry: entry_id,
            url_info: entry_record.and_then(|r| r.listen_port).map(UrlInfo::local),
        };
        Ok(graph.into_payload(meta))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper using default options.
pub fn build(root: &Path, entry: &Path) -> Result<GraphPayload, BuildError> {
    GraphBuilder::new().build(root, entry)
}

/// Per-run traversal state: visited set, FIFO queue and the graph under
/// construction.
struct Traversal<'a> {
    root: &'a Path,
    options: &'a BuildOptions,
    extractor: SourceExtractor,
    graph: ProjectGraph,
    visited: HashSet<PathBuf>,
    queue: VecDeque<PathBuf>,
    /// Directories already expanded.
    expanded: HashSet<PathBuf>,
    /// Lightweight text files already scanned for references.
    scanned: HashSet<PathBuf>,
}

impl<'a> Traversal<'a> {
    fn new(root: &'a Path, options: &'a BuildOptions) -> Self {
        Traversal {
            root,
            options,
            extractor: SourceExtractor::new(),
            graph: ProjectGraph::new(),
            visited: HashSet::new(),
            queue: VecDeque::new(),
            expanded: HashSet::new(),
            scanned: HashSet::new(),
        }
    }

    fn drain(&mut self) {
        while let Some(path) = self.queue.pop_front() {
            if !self.visited.insert(path.clone()) {
                continue;
            }
            match fs::read(&path) {
                Ok(bytes) => {
                    self.visit(&path, &String::from_utf8_lossy(&bytes));
                }
                // The node already exists from the reference; it keeps zero metrics.
                Err(err) => tracing::warn!("Failed to read {}: {}", path.display(), err),
            }
        }
    }

    fn enqueue(&mut self, path: PathBuf) {
        if !self.visited.contains(&path) {
            self.queue.push_back(path);
        }
    }

    /// Populate the node for a primary source file and follow its references.
    fn visit(&mut self, path: &Path, content: &str) -> Option<Extraction> {
        let id = node_id(self.root, path)?;
        let record = self.extractor.extract(content, path);
        self.graph.upsert_source(&id, &record.metrics());
        tracing::debug!(
            "Visited {} ({} lines, {} imports, {} refs)",
            id,
            record.lines,
            record.imports.len(),
            record.asset_refs.len() + record.file_refs_abs.len()
        );

        for spec in &record.imports {
            let Some(target) = resolve(path, spec, self.root) else {
                tracing::trace!("Unresolved import {:?} in {}", spec, id);
                continue;
            };
            let Some(target_id) = node_id(self.root, &target) else {
                continue;
            };
            if target_id == id {
                continue;
            }
            self.graph.ensure_node(&target_id, NodeKind::File);
            self.graph.add_link(&id, LinkType::Use, &target_id);
            self.enqueue(target);
        }

        self.follow_references(path, &id, &record, 0);
        Some(record)
    }

    fn follow_references(&mut self, path: &Path, id: &str, record: &Extraction, depth: usize) {
        let targets: Vec<PathBuf> = record
            .asset_refs
            .iter()
            .filter_map(|spec| resolve_reference(path, spec, self.root))
            .chain(
                record
                    .file_refs_abs
                    .iter()
                    .filter_map(|abs| accept_existing(abs, self.root)),
            )
            .collect();
        for target in targets {
            if target != path {
                self.include(id, &target, depth);
            }
        }
    }

    /// Add an `include` link to `target`, which exists and is contained.
    fn include(&mut self, from_id: &str, target: &Path, depth: usize) {
        let Some(target_id) = node_id(self.root, target) else {
            return;
        };
        if target.is_dir() {
            self.graph.ensure_node(&target_id, NodeKind::Dir);
            self.graph.add_link(from_id, LinkType::Include, &target_id);
            self.expand(target, &target_id, depth);
            return;
        }

        let category = FileCategory::from_path(target);
        let kind = if category.is_program() {
            NodeKind::File
        } else {
            NodeKind::Asset
        };
        self.graph.ensure_node(&target_id, kind);
        self.graph.add_link(from_id, LinkType::Include, &target_id);
        if category.is_program() {
            self.enqueue(target.to_path_buf());
        } else if category.is_lightweight_text() {
            self.scan_text(target, &target_id, depth);
        }
    }

    /// Bounded directory expansion: sorted, capped listing; recursion stops
    /// at the depth cap and each directory is expanded once.
    fn expand(&mut self, dir: &Path, dir_id: &str, depth: usize) {
        if depth >= self.options.max_dir_depth || !self.expanded.insert(dir.to_path_buf()) {
            return;
        }
        for child in list_dir(dir, self.options.max_dir_entries) {
            if accept_existing(&child, self.root).is_none() {
                tracing::trace!("Skipping {}: escapes project root", child.display());
                continue;
            }
            if child.is_dir() {
                let Some(child_id) = node_id(self.root, &child) else {
                    continue;
                };
                self.graph.ensure_node(&child_id, NodeKind::Dir);
                self.graph.add_link(dir_id, LinkType::Include, &child_id);
                self.expand(&child, &child_id, depth + 1);
            } else {
                self.include(dir_id, &child, depth + 1);
            }
        }
    }

    /// Extract a lightweight text file once, for its metrics and references.
    /// It is never enqueued as a primary source.
    fn scan_text(&mut self, path: &Path, id: &str, depth: usize) {
        if self.visited.contains(path) || !self.scanned.insert(path.to_path_buf()) {
            return;
        }
        let content = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::debug!("Failed to read {}: {}", path.display(), err);
                return;
            }
        };
        let record = self.extractor.extract(&content, path);
        let (node, _) = self.graph.ensure_node(id, NodeKind::Asset);
        node.absorb(&record.metrics());
        self.follow_references(path, id, &record, depth);
    }
}
