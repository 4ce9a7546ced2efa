//! Remote ref listing for change detection.
//!
//! The updater only needs to know the commit a branch points at, so
//! instead of cloning anything it asks the remote for its advertised refs
//! (the equivalent of `git ls-remote`). The lookup sits behind the
//! [`RemoteRefLister`] trait so tests can substitute a fake remote.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DocsError, Result};

/// Lists the refs advertised by a remote repository.
#[async_trait]
pub trait RemoteRefLister: Send + Sync {
    /// Returns fully-qualified ref name → commit hash.
    ///
    /// Must return [`DocsError::Cancelled`] promptly once `cancel` fires.
    async fn list_refs(&self, cancel: &CancellationToken) -> Result<HashMap<String, String>>;
}

/// [`RemoteRefLister`] backed by the `git` binary.
pub struct GitRefLister {
    repo_url: String,
}

impl GitRefLister {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
        }
    }
}

#[async_trait]
impl RemoteRefLister for GitRefLister {
    async fn list_refs(&self, cancel: &CancellationToken) -> Result<HashMap<String, String>> {
        debug!(repo = %self.repo_url, "listing remote refs");
        let child = Command::new("git")
            .args(["ls-remote", "--quiet", self.repo_url.as_str()])
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DocsError::RefList {
                message: format!("failed to run git: {e}"),
            })?;

        // Dropping the child future on cancellation kills the process.
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(DocsError::Cancelled),
            output = child.wait_with_output() => output.map_err(|e| DocsError::RefList {
                message: e.to_string(),
            })?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocsError::RefList {
                message: format!("git ls-remote exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses `git ls-remote` output (`<sha>\t<ref>` per line).
pub fn parse_ls_remote(output: &str) -> HashMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let (sha, name) = line.split_once('\t')?;
            let (sha, name) = (sha.trim(), name.trim());
            if sha.is_empty() || name.is_empty() {
                return None;
            }
            Some((name.to_string(), sha.to_string()))
        })
        .collect()
}
