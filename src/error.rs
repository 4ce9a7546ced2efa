//! Error type for the documentation pipeline.
//!
//! Everything below the tool layer (extraction, chunking, indexing, ref
//! listing, fetching and publishing) reports failures as [`DocsError`].
//! The application layer wraps these in `anyhow` like the rest of the crate.

pub type Result<T> = std::result::Result<T, DocsError>;

type BoxError = Box<DocsError>;

/// Errors produced while fetching, building, publishing, or reading docs.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to query remote refs: {0}")]
    RefQuery(#[source] BoxError),

    #[error("failed to list remote refs: {message}")]
    RefList { message: String },

    #[error("{reference} not found in remote repository")]
    RefNotFound { reference: String },

    #[error("failed to download archive: {0}")]
    Download(#[from] reqwest::Error),

    #[error("{}", http_status_message(.status, .body))]
    HttpStatus { status: u16, body: String },

    #[error("archive exceeds maximum download size of {limit} bytes")]
    DownloadTooLarge { limit: u64 },

    #[error("failed to read tar header entry: {0}")]
    TarHeader(#[source] std::io::Error),

    #[error("failed to read tar entry {path}: {source}")]
    TarEntry {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "archive exceeds maximum decompressed size: extracted {extracted} bytes, \
         next file ({path}, {size} bytes) would exceed limit of {limit} bytes"
    )]
    DecompressedSizeExceeded {
        extracted: u64,
        path: String,
        size: u64,
        limit: u64,
    },

    #[error("archive exceeds maximum file count of {limit}")]
    FileCountExceeded { limit: usize },

    #[error("no markdown files found in archive")]
    NoMarkdownFiles,

    #[error("failed to read docs directory {path}: {message}")]
    LocalDir { path: String, message: String },

    #[error("docs file {path} is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("invalid chunker configuration: {message}")]
    ChunkConfig { message: String },

    #[error("failed to build docs search index: {0}")]
    Index(#[source] tantivy::TantivyError),

    #[error("failed to search docs index: {0}")]
    Search(#[source] tantivy::TantivyError),

    #[error("docs filesystem not provided")]
    FsNotProvided,

    #[error("docs search index not initialized")]
    IndexNotInitialized,

    #[error("docs file {path} not found")]
    NotFound { path: String },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("failed to extract docs from archive: {0}")]
    Extract(#[source] BoxError),

    #[error("failed to build docs state: {0}")]
    Build(#[source] BoxError),

    #[error("docs build task failed: {message}")]
    Task { message: String },

    #[error("docs update check failed: {0}")]
    UpdateCheck(#[source] BoxError),

    #[error("failed to update docs to new commit {commit}: {source}")]
    UpdateApply {
        commit: String,
        #[source]
        source: BoxError,
    },
}

fn http_status_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        format!("archive download returned status {status}")
    } else {
        format!("archive download returned status {status}: {body}")
    }
}

impl DocsError {
    /// True if this error, or any error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            DocsError::Cancelled => true,
            DocsError::RefQuery(inner)
            | DocsError::UpdateCheck(inner)
            | DocsError::Extract(inner)
            | DocsError::Build(inner) => inner.is_cancelled(),
            DocsError::UpdateApply { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DocsError::NotFound { .. })
    }
}
