//! Safe extraction of the upstream docs tarball.
//!
//! The upstream repository is published as a gzip-compressed tar whose
//! entries all live under a single wrapper directory (`docs-main/`,
//! `docs-<sha>/`, ...). Only the markdown under `<wrapper>/docs/` is kept,
//! and it is kept in memory: nothing is ever written to disk.
//!
//! # Guards
//!
//! The archive is untrusted input. Extraction aborts (returning no partial
//! result) when:
//!
//! - the declared sizes of extracted files would exceed
//!   [`MAX_DECOMPRESSED_SIZE`];
//! - more than [`MAX_FILE_COUNT`] markdown files would be extracted.
//!
//! Entries whose path escapes the docs root (`..`, absolute paths) are
//! skipped rather than rejected, as are non-regular entries and anything
//! that is not `.md`.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use crate::error::{DocsError, Result};
use crate::models::{is_markdown, DocsFs};

/// Maximum total size of extracted markdown, in bytes.
pub const MAX_DECOMPRESSED_SIZE: u64 = 200 * 1024 * 1024;

/// Maximum number of extracted markdown files.
pub const MAX_FILE_COUNT: usize = 10_000;

const DOCS_PREFIX: &str = "docs/";

/// Extracts `docs/**/*.md` from a gzip+tar stream into a [`DocsFs`].
pub fn extract_docs_from_archive<R: Read>(reader: R) -> Result<DocsFs> {
    extract_with_limits(reader, MAX_DECOMPRESSED_SIZE, MAX_FILE_COUNT)
}

pub(crate) fn extract_with_limits<R: Read>(
    reader: R,
    max_size: u64,
    max_files: usize,
) -> Result<DocsFs> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut fs = DocsFs::new();
    let mut total: u64 = 0;

    for entry in archive.entries().map_err(DocsError::TarHeader)? {
        let mut entry = entry.map_err(DocsError::TarHeader)?;

        let raw_path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let Some(rel) = docs_relative_path(&raw_path) else {
            continue;
        };

        if !matches!(
            entry.header().entry_type(),
            EntryType::Regular | EntryType::Continuous
        ) {
            continue;
        }
        if !is_markdown(Path::new(&rel)) {
            continue;
        }

        let size = entry.header().size().map_err(DocsError::TarHeader)?;
        if size > max_size.saturating_sub(total) {
            return Err(DocsError::DecompressedSizeExceeded {
                extracted: total,
                path: raw_path,
                size,
                limit: max_size,
            });
        }
        if fs.len() >= max_files {
            return Err(DocsError::FileCountExceeded { limit: max_files });
        }

        let mut data = Vec::with_capacity(size as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|source| DocsError::TarEntry {
                path: raw_path.clone(),
                source,
            })?;

        total += size;
        fs.insert(rel, data);
    }

    if fs.is_empty() {
        return Err(DocsError::NoMarkdownFiles);
    }
    Ok(fs)
}

/// Maps an archive entry path to its path under the docs root.
///
/// Returns `None` for entries outside `<wrapper>/docs/`, for the docs root
/// itself, and for anything that would escape the root.
fn docs_relative_path(raw: &str) -> Option<String> {
    let (_wrapper, rest) = raw.split_once('/')?;
    let rest = rest.strip_prefix(DOCS_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    match normalize(rest) {
        Some(path) => Some(path),
        None => {
            debug!(path = raw, "skipping archive entry outside docs root");
            None
        }
    }
}

/// Lexically normalizes a relative path, rejecting anything unsafe.
fn normalize(path: &str) -> Option<String> {
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return None;
    }
    let mut parts = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
