//! Core data models for the documentation corpus.
//!
//! [`DocsFs`] is the read-only virtual tree extracted from an archive (or
//! loaded from a local directory), and [`Chunk`] is the unit the search
//! index is built over.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{DocsError, Result};

/// A contiguous slice of one document.
///
/// `id` is the 1-based position of the chunk within its document and
/// `name` is the document path relative to the docs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: usize,
    pub name: String,
    pub content: String,
}

impl Chunk {
    /// Composite key stored in the search index, `"<name>#<id>"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Splits a chunk key back into its document path.
///
/// The id is separated by the last `#`, so document names containing `#`
/// still resolve.
pub fn doc_name_from_key(key: &str) -> &str {
    match key.rsplit_once('#') {
        Some((name, id)) if id.parse::<usize>().is_ok() => name,
        _ => key,
    }
}

/// In-memory, read-only documentation tree.
///
/// Paths are `/`-separated and relative to the docs root; iteration is in
/// lexical path order.
#[derive(Debug, Clone, Default)]
pub struct DocsFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl DocsFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.md` file under `root`. Symlinks are not followed.
    pub fn from_dir(root: &Path) -> Result<Self> {
        let mut fs = DocsFs::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| DocsError::LocalDir {
                path: root.display().to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let data = std::fs::read(entry.path()).map_err(|e| DocsError::LocalDir {
                path: entry.path().display().to_string(),
                message: e.to_string(),
            })?;
            fs.insert(rel, data);
        }
        if fs.is_empty() {
            return Err(DocsError::NoMarkdownFiles);
        }
        Ok(fs)
    }

    pub fn insert(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn read(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Total size of all file contents in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|d| d.len() as u64).sum()
    }
}

/// Case-insensitive `.md` extension check.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}
