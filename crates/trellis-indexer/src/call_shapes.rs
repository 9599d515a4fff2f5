//! Closed set of recognized path-producing call shapes
//!
//! A call is reduced to a [`CallSite`] (callee member chain plus classified
//! arguments) and evaluated against each [`CallShape`]. A shape either yields a
//! fully determined path or nothing; arguments that are not string literals or
//! known directory anchors make the whole call opaque.

use std::path::PathBuf;
use trellis_core::paths::normalize;

/// One argument of a call, as far as path evaluation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathArg {
    /// A string literal (or template string without substitutions).
    Literal(String),
    /// An absolute directory or path: `__dirname`, a captured anchor variable,
    /// or a nested join that evaluated to an absolute path.
    Anchor(PathBuf),
    /// Anything else.
    Opaque,
}

/// A call expression reduced to what the matchers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Member chain of the callee, e.g. `["path", "join"]`.
    pub callee: Vec<String>,
    pub args: Vec<PathArg>,
}

impl CallSite {
    pub fn new(callee: Vec<String>, args: Vec<PathArg>) -> Self {
        CallSite { callee, args }
    }

    fn callee_is(&self, chain: &[&str]) -> bool {
        self.callee.len() == chain.len() && self.callee.iter().zip(chain).all(|(a, b)| a == b)
    }

    fn last_segment(&self) -> Option<&str> {
        self.callee.last().map(String::as_str)
    }
}

/// A path produced by a matched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRef {
    /// Anchored to a known directory; already absolute and normalized.
    Absolute(PathBuf),
    /// Literal-only; resolved later against the file and project directories.
    Relative(String),
}

impl PathRef {
    /// Convert back into an argument for an enclosing call.
    pub fn into_arg(self) -> PathArg {
        match self {
            PathRef::Absolute(p) => PathArg::Anchor(p),
            PathRef::Relative(s) => PathArg::Literal(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `path.join(...)`, `join(...)`
    PathJoin,
    /// `path.resolve(...)`, `resolve(...)`
    PathResolve,
    /// `express.static(dir)`, `serveStatic(dir)`
    StaticServe,
    /// `fs.readFileSync(p)`, `fs.promises.readFile(p)`, ...
    FsRead,
    /// `res.sendFile(p)`, `res.download(p)`
    SendFile,
}

const FS_READS: &[&str] = &[
    "readFileSync", "readFile", "createReadStream", "existsSync", "readdirSync", "readdir",
    "statSync", "stat", "access", "accessSync", "openSync", "open",
];

const BARE_FS_READS: &[&str] = &["readFileSync", "readFile", "createReadStream", "existsSync", "readdirSync"];

impl CallShape {
    pub const ALL: [CallShape; 5] = [
        CallShape::PathJoin,
        CallShape::PathResolve,
        CallShape::StaticServe,
        CallShape::FsRead,
        CallShape::SendFile,
    ];

    /// True if the callee chain has this shape.
    pub fn matches_callee(&self, site: &CallSite) -> bool {
        match self {
            CallShape::PathJoin => {
                site.callee_is(&["path", "join"])
                    || site.callee_is(&["path", "posix", "join"])
                    || site.callee_is(&["join"])
            }
            CallShape::PathResolve => {
                site.callee_is(&["path", "resolve"])
                    || site.callee_is(&["path", "posix", "resolve"])
                    || site.callee_is(&["resolve"])
            }
            CallShape::StaticServe => {
                site.callee_is(&["express", "static"])
                    || site.callee_is(&["serveStatic"])
                    || site.callee_is(&["koaStatic"])
                    || site.callee_is(&["serve"])
            }
            CallShape::FsRead => match site.callee.as_slice() {
                [fs, method] => fs == "fs" && FS_READS.contains(&method.as_str()),
                [fs, promises, method] => {
                    fs == "fs" && promises == "promises" && FS_READS.contains(&method.as_str())
                }
                [method] => BARE_FS_READS.contains(&method.as_str()),
                _ => false,
            },
            CallShape::SendFile => {
                site.callee.len() >= 2
                    && matches!(site.last_segment(), Some("sendFile" | "sendfile" | "download"))
            }
        }
    }

    /// Evaluate a call already known to have this callee shape.
    pub fn evaluate(&self, site: &CallSite) -> Option<PathRef> {
        if site.args.is_empty() {
            return None;
        }
        match self {
            CallShape::PathJoin => join(&site.args),
            CallShape::PathResolve => resolve(&site.args),
            CallShape::StaticServe | CallShape::FsRead | CallShape::SendFile => {
                single(&site.args[0])
            }
        }
    }
}

/// Find the first shape whose callee matches and evaluate it. A callee match
/// with opaque arguments yields `None` rather than trying later shapes.
pub fn match_call(site: &CallSite) -> Option<(CallShape, PathRef)> {
    let shape = CallShape::ALL.into_iter().find(|s| s.matches_callee(site))?;
    shape.evaluate(site).map(|path| (shape, path))
}

fn single(arg: &PathArg) -> Option<PathRef> {
    match arg {
        PathArg::Literal(s) if !s.is_empty() => Some(PathRef::Relative(s.clone())),
        PathArg::Anchor(p) => Some(PathRef::Absolute(normalize(p))),
        _ => None,
    }
}

/// `path.join`: an anchor is only accepted in first position; every other
/// argument must be a literal.
fn join(args: &[PathArg]) -> Option<PathRef> {
    let (first, rest) = args.split_first()?;
    let mut literals = Vec::with_capacity(rest.len());
    for arg in rest {
        match arg {
            PathArg::Literal(s) => literals.push(s.as_str()),
            _ => return None,
        }
    }
    match first {
        PathArg::Anchor(base) => {
            let mut path = base.clone();
            for lit in literals {
                path.push(lit.trim_start_matches('/'));
            }
            Some(PathRef::Absolute(normalize(&path)))
        }
        PathArg::Literal(head) => {
            let mut joined = head.clone();
            for lit in literals {
                if !joined.ends_with('/') && !joined.is_empty() {
                    joined.push('/');
                }
                joined.push_str(lit.trim_start_matches('/'));
            }
            (!joined.is_empty()).then_some(PathRef::Relative(joined))
        }
        PathArg::Opaque => None,
    }
}

/// `path.resolve`: later absolute segments (anchors or `/x` literals) reset
/// the base, as at runtime.
fn resolve(args: &[PathArg]) -> Option<PathRef> {
    let mut base: Option<PathBuf> = None;
    let mut pending: Vec<&str> = Vec::new();
    for arg in args {
        match arg {
            PathArg::Anchor(p) => {
                base = Some(p.clone());
                pending.clear();
            }
            PathArg::Literal(s) if s.starts_with('/') => {
                base = Some(PathBuf::from(s));
                pending.clear();
            }
            PathArg::Literal(s) => pending.push(s.as_str()),
            PathArg::Opaque => return None,
        }
    }
    match base {
        Some(mut path) => {
            for lit in pending {
                path.push(lit);
            }
            Some(PathRef::Absolute(normalize(&path)))
        }
        None if !pending.is_empty() => Some(PathRef::Relative(pending.join("/"))),
        None => None,
    }
}
