//! Deterministic mapping from CMS nodes to local files.
//!
//! Logical paths are `/`-separated strings built while descending the remote tree
//! (`""` for the root, `"/Root/Docs"` below it). They are turned into filesystem
//! paths only here, so the rest of the crate never joins paths by hand.

use std::path::{Path, PathBuf};

use crate::node::NodeType;

/// Extension used when a node name has no `.`.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Marker inserted between base name and extension of draft bodies.
pub const DRAFT_MARKER: &str = "(draft)";

/// Directory below the content root that mirrors metadata fragments.
pub const META_DIR: &str = "meta";

/// Content root and metadata root of one export run.
#[derive(Debug, Clone)]
pub struct ExportRoots {
    root: PathBuf,
    meta_root: PathBuf,
}

impl ExportRoots {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let meta_root = root.join(META_DIR);
        Self { root, meta_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta_root(&self) -> &Path {
        &self.meta_root
    }

    /// Content and metadata directories of the section at `logical`.
    pub fn section_dirs(&self, logical: &str) -> (PathBuf, PathBuf) {
        (
            join_logical(&self.root, logical),
            join_logical(&self.meta_root, logical),
        )
    }
}

/// Draft and published destinations of one content body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPaths {
    pub draft: PathBuf,
    pub published: PathBuf,
}

impl ContentPaths {
    /// Splits the file name of `destination` on its first `.` and derives both
    /// body paths next to it. `None` if `destination` has no file name.
    pub fn from_destination(destination: &Path) -> Option<Self> {
        let file_name = destination.file_name()?.to_str()?;
        let dir = destination.parent().unwrap_or_else(|| Path::new(""));
        Some(Self::in_dir(dir, file_name))
    }

    fn in_dir(dir: &Path, name: &str) -> Self {
        let (base, extension) = split_extension(name);
        Self {
            draft: dir.join(format!("{base}{DRAFT_MARKER}{extension}")),
            published: dir.join(format!("{base}{extension}")),
        }
    }
}

/// Every local destination of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePaths {
    pub meta: PathBuf,
    /// `None` for types without draft/published bodies.
    pub content: Option<ContentPaths>,
}

/// Maps a node below `parent` (a logical path) to its local destinations.
///
/// The metadata path always uses the raw name. Partial names may carry a
/// namespace separated by `/`; in the content path it becomes `-`.
pub fn map_path(roots: &ExportRoots, parent: &str, name: &str, kind: NodeType) -> NodePaths {
    let meta = join_logical(roots.meta_root(), &format!("{parent}/{name}.html"));

    let content = if kind.is_content_bearing() {
        let file_name = match kind {
            NodeType::Partial => name.replace('/', "-"),
            NodeType::Page | NodeType::Layout | NodeType::Section | NodeType::File => {
                name.to_string()
            }
        };
        let logical = format!("{parent}/{file_name}");
        let (dir, last) = logical.rsplit_once('/').unwrap_or(("", logical.as_str()));
        Some(ContentPaths::in_dir(&join_logical(roots.root(), dir), last))
    } else {
        None
    };

    NodePaths { meta, content }
}

/// Logical path of `name` below `parent`; the root parent is the empty path.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Splits `name` at its first `.`: `("jquery", ".min.js")`, or the whole name
/// with [`DEFAULT_EXTENSION`] when there is no `.`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(index) => name.split_at(index),
        None => (name, DEFAULT_EXTENSION),
    }
}

/// Appends the segments of a logical path to `base`. Empty, `.` and `..`
/// segments are dropped so no node name can escape the export root.
pub fn join_logical(base: &Path, logical: &str) -> PathBuf {
    logical
        .split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}
