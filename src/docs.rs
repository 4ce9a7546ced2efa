//! Published documentation state and the handle readers go through.
//!
//! A [`DocsState`] bundles one consistent generation of the corpus: the
//! virtual filesystem, its chunks, and the search index built from exactly
//! those chunks. States are immutable once built.
//!
//! [`DocsHandle`] owns the single slot holding the current state. Readers
//! take a snapshot (an `Arc` clone under a momentary read lock) and work on
//! it without holding any lock, so a concurrent swap never blocks or tears a
//! read. A superseded state is dropped when its last reader lets go.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::chunk::{strip_front_matter, DocsChunker};
use crate::error::{DocsError, Result};
use crate::index::SearchIndex;
use crate::models::{Chunk, DocsFs};

/// One immutable generation of the docs corpus.
pub struct DocsState {
    fs: DocsFs,
    chunks: Vec<Chunk>,
    index: SearchIndex,
}

impl DocsState {
    /// Chunks every file in `fs` (in path order) and indexes the chunks.
    ///
    /// Files must be UTF-8; front matter is stripped before chunking.
    pub fn build(fs: DocsFs) -> Result<Self> {
        let chunker = DocsChunker::with_defaults()?;
        let mut chunks = Vec::new();
        for path in fs.paths() {
            let content = doc_text(&fs, path)?;
            chunks.extend(chunker.chunk(path, content));
        }
        let index = SearchIndex::build(&chunks)?;
        debug!(
            files = fs.len(),
            chunks = chunks.len(),
            indexed = index.len(),
            "built docs state"
        );
        Ok(Self { fs, chunks, index })
    }

    pub fn fs(&self) -> &DocsFs {
        &self.fs
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn list_docs(&self) -> Vec<String> {
        self.fs.paths().map(str::to_string).collect()
    }

    pub fn read_doc(&self, path: &str) -> Result<String> {
        doc_text(&self.fs, path).map(str::to_string)
    }

    pub fn search_docs(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        self.index.search(query, limit)
    }

    /// Builds a state from the markdown files under a local directory.
    pub fn load_dir(root: &Path) -> Result<Self> {
        Self::build(DocsFs::from_dir(root)?)
    }
}

fn doc_text<'a>(fs: &'a DocsFs, path: &str) -> Result<&'a str> {
    let data = fs.read(path).ok_or_else(|| DocsError::NotFound {
        path: path.to_string(),
    })?;
    let text = std::str::from_utf8(data).map_err(|_| DocsError::InvalidUtf8 {
        path: path.to_string(),
    })?;
    Ok(strip_front_matter(text))
}

/// Summary counts of a published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DocsStats {
    pub files: usize,
    pub chunks: usize,
    pub indexed: usize,
    pub bytes: u64,
}

/// Shared, swappable reference to the current [`DocsState`].
#[derive(Clone, Default)]
pub struct DocsHandle {
    slot: Arc<RwLock<Option<Arc<DocsState>>>>,
}

impl DocsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that starts out publishing `state`.
    pub fn with_state(state: DocsState) -> Self {
        let handle = Self::new();
        handle.publish(state);
        handle
    }

    /// Current state, if any has been published.
    pub fn snapshot(&self) -> Option<Arc<DocsState>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replaces the current state, returning the previous one.
    pub fn publish(&self, state: DocsState) -> Option<Arc<DocsState>> {
        let next = Arc::new(state);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(next)
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn stats(&self) -> Option<DocsStats> {
        self.snapshot().map(|state| DocsStats {
            files: state.fs.len(),
            chunks: state.chunks.len(),
            indexed: state.index.len(),
            bytes: state.fs.total_bytes(),
        })
    }

    /// All document paths in lexical order.
    pub fn list_docs(&self) -> Result<Vec<String>> {
        let state = self.snapshot().ok_or(DocsError::FsNotProvided)?;
        Ok(state.list_docs())
    }

    /// Content of one document with its front matter removed.
    pub fn read_doc(&self, path: &str) -> Result<String> {
        let state = self.snapshot().ok_or(DocsError::FsNotProvided)?;
        state.read_doc(path)
    }

    /// Chunk keys matching `query`, best first.
    ///
    /// A non-positive `limit` means [`crate::index::DEFAULT_SEARCH_LIMIT`].
    pub fn search_docs(&self, query: &str, limit: i64) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(DocsError::EmptyQuery);
        }
        let state = self.snapshot().ok_or(DocsError::IndexNotInitialized)?;
        let limit = usize::try_from(limit).unwrap_or(0);
        state.search_docs(query, limit)
    }
}
