//! Background refresh of the documentation corpus.
//!
//! [`DocsUpdater`] keeps the published [`DocsState`] in step with the
//! upstream repository:
//!
//! 1. **Check**: ask the remote for the commit its branch points at and
//!    compare it with the last commit we published.
//! 2. **Fetch**: if it moved, download the repository tarball (capped at
//!    [`MAX_ARCHIVE_SIZE`]).
//! 3. **Build**: extract and index off the async runtime.
//! 4. **Publish**: swap the new state into the [`DocsHandle`].
//!
//! Any failure leaves both the published state and the remembered commit
//! untouched, so the next cycle retries. Cycles are serialized by an async
//! mutex; reads never wait on it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::extract_docs_from_archive;
use crate::config::DocsConfig;
use crate::docs::{DocsHandle, DocsState};
use crate::error::{DocsError, Result};
use crate::refs::{GitRefLister, RemoteRefLister};

/// Upstream documentation repository.
pub const DOCS_REPO_URL: &str = "https://github.com/prometheus/docs.git";

/// Tarball of the upstream default branch.
pub const DOCS_ARCHIVE_URL: &str =
    "https://github.com/prometheus/docs/archive/refs/heads/main.tar.gz";

/// Branch whose head is tracked.
pub const DOCS_BRANCH: &str = "main";

/// Maximum size of the compressed archive download, in bytes.
pub const MAX_ARCHIVE_SIZE: u64 = 50 * 1024 * 1024;

/// Overall timeout for a single archive download.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between update cycles.
pub const DOCS_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const ERROR_BODY_LIMIT: usize = 512;

const USER_AGENT: &str = concat!("prometheus-mcp/", env!("CARGO_PKG_VERSION"));

/// What a single [`DocsUpdater::update`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { commit: String },
    Updated { old: String, new: String },
}

/// Bookkeeping shared by update cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    /// Commit of the currently published docs; empty if unknown.
    pub commit: String,
    pub last_success: Option<DateTime<Utc>>,
    pub failures: u64,
}

pub struct DocsUpdater {
    handle: DocsHandle,
    client: reqwest::Client,
    lister: Arc<dyn RemoteRefLister>,
    ref_name: String,
    archive_url: String,
    max_archive_size: u64,
    status: Mutex<UpdateStatus>,
}

impl DocsUpdater {
    /// Creates an updater publishing into `handle`.
    ///
    /// `current_commit` is the commit of whatever `handle` already serves
    /// (empty if nothing or unknown, which forces the first cycle to fetch).
    pub fn new(
        handle: DocsHandle,
        lister: Arc<dyn RemoteRefLister>,
        archive_url: impl Into<String>,
        current_commit: impl Into<String>,
    ) -> Result<Self> {
        Self::with_timeout(handle, lister, archive_url, current_commit, HTTP_TIMEOUT)
    }

    fn with_timeout(
        handle: DocsHandle,
        lister: Arc<dyn RemoteRefLister>,
        archive_url: impl Into<String>,
        current_commit: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            handle,
            client,
            lister,
            ref_name: branch_ref(DOCS_BRANCH),
            archive_url: archive_url.into(),
            max_archive_size: MAX_ARCHIVE_SIZE,
            status: Mutex::new(UpdateStatus {
                commit: current_commit.into(),
                ..UpdateStatus::default()
            }),
        })
    }

    /// Updater wired to `git ls-remote` and the configured archive URL.
    ///
    /// `initial_commit` only describes the seeded docs, so it is ignored
    /// unless `handle` already serves something.
    pub fn from_config(config: &DocsConfig, handle: DocsHandle) -> Result<Self> {
        let lister = Arc::new(GitRefLister::new(config.repo_url.clone()));
        let current = match &config.initial_commit {
            Some(commit) if handle.is_ready() => commit.clone(),
            _ => String::new(),
        };
        let updater = Self::with_timeout(
            handle,
            lister,
            config.archive_url.clone(),
            current,
            Duration::from_secs(config.http_timeout_secs),
        )?;
        Ok(updater.with_branch(&config.branch))
    }

    /// Tracks `branch` instead of the default.
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.ref_name = branch_ref(branch);
        self
    }

    pub(crate) fn with_max_archive_size(mut self, bytes: u64) -> Self {
        self.max_archive_size = bytes;
        self
    }

    pub fn handle(&self) -> &DocsHandle {
        &self.handle
    }

    pub async fn status(&self) -> UpdateStatus {
        self.status.lock().await.clone()
    }

    /// Asks the remote for the tracked branch's commit.
    ///
    /// Returns the commit and whether it differs from the published one.
    pub async fn check_for_update(&self, cancel: &CancellationToken) -> Result<(String, bool)> {
        let current = self.status.lock().await.commit.clone();
        self.check_against(&current, cancel).await
    }

    async fn check_against(
        &self,
        current: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, bool)> {
        debug!(reference = %self.ref_name, "checking for documentation updates");
        let refs = self
            .lister
            .list_refs(cancel)
            .await
            .map_err(|e| DocsError::RefQuery(Box::new(e)))?;

        let sha = refs
            .get(&self.ref_name)
            .cloned()
            .ok_or_else(|| DocsError::RefNotFound {
                reference: self.ref_name.clone(),
            })?;

        let changed = sha != current;
        if changed {
            debug!(current, new = %sha, "new documentation commit found");
        }
        Ok((sha, changed))
    }

    /// Downloads, extracts, and indexes the archive, then publishes it.
    ///
    /// On any failure nothing is published.
    pub async fn fetch_and_update_docs(&self, cancel: &CancellationToken) -> Result<()> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(DocsError::Cancelled),
            response = self.client.get(&self.archive_url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(DocsError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let archive = self.read_archive(response, cancel).await?;
        debug!(bytes = archive.len(), "downloaded docs archive");

        let state = tokio::task::spawn_blocking(move || {
            let fs = extract_docs_from_archive(archive.as_slice())
                .map_err(|e| DocsError::Extract(Box::new(e)))?;
            DocsState::build(fs).map_err(|e| DocsError::Build(Box::new(e)))
        })
        .await
        .map_err(|e| DocsError::Task {
            message: e.to_string(),
        })??;

        if cancel.is_cancelled() {
            return Err(DocsError::Cancelled);
        }

        let (files, chunks) = (state.fs().len(), state.chunks().len());
        self.handle.publish(state);
        debug!(files, chunks, "published docs state");
        Ok(())
    }

    async fn read_archive(
        &self,
        mut response: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let limit = self.max_archive_size;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(DocsError::DownloadTooLarge { limit });
        }

        let mut data = Vec::new();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(DocsError::Cancelled),
                chunk = response.chunk() => chunk?,
            };
            let Some(chunk) = chunk else { break };
            if data.len() as u64 + chunk.len() as u64 > limit {
                return Err(DocsError::DownloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Runs one check-and-apply cycle.
    ///
    /// Fetches when the remote commit moved or when the handle has never
    /// been published. Concurrent callers are serialized. The remembered commit only
    /// advances after a successful publish.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<UpdateOutcome> {
        let mut status = self.status.lock().await;
        let current = status.commit.clone();

        let (commit, changed) = match self.check_against(&current, cancel).await {
            Ok(checked) => checked,
            Err(err) => {
                status.failures += 1;
                return Err(DocsError::UpdateCheck(Box::new(err)));
            }
        };
        // Nothing published yet means there is nothing to be up to date with.
        if !changed && self.handle.is_ready() {
            return Ok(UpdateOutcome::UpToDate { commit });
        }

        if let Err(err) = self.fetch_and_update_docs(cancel).await {
            status.failures += 1;
            return Err(DocsError::UpdateApply {
                commit,
                source: Box::new(err),
            });
        }

        let old = std::mem::replace(&mut status.commit, commit.clone());
        status.last_success = Some(Utc::now());
        info!(old_commit = %old, new_commit = %commit, "docs updated successfully");
        Ok(UpdateOutcome::Updated { old, new: commit })
    }

    /// Runs [`update`](Self::update) now and then every `interval` until
    /// `cancel` fires. Failed cycles are logged and retried next tick.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.update(&cancel).await {
                Ok(UpdateOutcome::UpToDate { commit }) => {
                    debug!(commit = %commit, "docs already up to date")
                }
                Ok(UpdateOutcome::Updated { .. }) => {}
                Err(err) if err.is_cancelled() => break,
                Err(err) => warn!(error = %err, "docs update failed"),
            }
        }
        debug!("docs updater stopped");
    }
}

fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use super::*;
    use crate::archive::test_support::build_archive;
    use crate::models::DocsFs;

    /// Fake remote: returns whatever refs it is told to, counting calls.
    struct MockLister {
        refs: std::sync::Mutex<std::result::Result<HashMap<String, String>, String>>,
        calls: AtomicUsize,
        block: bool,
    }

    impl MockLister {
        fn with_main(sha: &str) -> Arc<Self> {
            Arc::new(Self {
                refs: std::sync::Mutex::new(Ok(main_ref(sha))),
                calls: AtomicUsize::new(0),
                block: false,
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                refs: std::sync::Mutex::new(Err(message.to_string())),
                calls: AtomicUsize::new(0),
                block: false,
            })
        }

        fn blocking() -> Arc<Self> {
            Arc::new(Self {
                refs: std::sync::Mutex::new(Ok(HashMap::new())),
                calls: AtomicUsize::new(0),
                block: true,
            })
        }

        fn set_refs(&self, refs: HashMap<String, String>) {
            *self.refs.lock().unwrap() = Ok(refs);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteRefLister for MockLister {
        async fn list_refs(&self, cancel: &CancellationToken) -> Result<HashMap<String, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.block {
                cancel.cancelled().await;
                return Err(DocsError::Cancelled);
            }
            self.refs
                .lock()
                .unwrap()
                .clone()
                .map_err(|message| DocsError::RefList { message })
        }
    }

    fn main_ref(sha: &str) -> HashMap<String, String> {
        HashMap::from([
            ("HEAD".to_string(), sha.to_string()),
            ("refs/heads/main".to_string(), sha.to_string()),
        ])
    }

    /// Serves a mutable (status, body) pair at `/docs.tar.gz`, counting hits.
    #[derive(Clone)]
    struct ArchiveServer {
        response: Arc<std::sync::Mutex<(StatusCode, Vec<u8>)>>,
        hits: Arc<AtomicUsize>,
        url: String,
    }

    impl ArchiveServer {
        async fn start(status: StatusCode, body: Vec<u8>) -> Self {
            let response = Arc::new(std::sync::Mutex::new((status, body)));
            let hits = Arc::new(AtomicUsize::new(0));

            let app = Router::new()
                .route("/docs.tar.gz", get(serve_archive))
                .with_state((response.clone(), hits.clone()));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                response,
                hits,
                url: format!("http://{addr}/docs.tar.gz"),
            }
        }

        fn set(&self, status: StatusCode, body: Vec<u8>) {
            *self.response.lock().unwrap() = (status, body);
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    type ArchiveState = (Arc<std::sync::Mutex<(StatusCode, Vec<u8>)>>, Arc<AtomicUsize>);

    async fn serve_archive(State((response, hits)): State<ArchiveState>) -> (StatusCode, Vec<u8>) {
        hits.fetch_add(1, Ordering::SeqCst);
        response.lock().unwrap().clone()
    }

    fn docs_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let files: Vec<(String, &str)> = files
            .iter()
            .map(|(path, body)| (format!("docs/{path}"), *body))
            .collect();
        let files: Vec<(&str, &str)> = files.iter().map(|(p, b)| (p.as_str(), *b)).collect();
        build_archive("docs-main", &files)
    }

    fn seeded_handle(files: &[(&str, &str)]) -> DocsHandle {
        let mut fs = DocsFs::new();
        for (path, body) in files {
            fs.insert(*path, body.as_bytes().to_vec());
        }
        DocsHandle::with_state(DocsState::build(fs).unwrap())
    }

    fn updater(handle: DocsHandle, lister: Arc<MockLister>, url: &str, commit: &str) -> DocsUpdater {
        DocsUpdater::new(handle, lister, url, commit).unwrap()
    }

    #[tokio::test]
    async fn test_check_detects_new_commit() {
        let lister = MockLister::with_main("abc123");
        let u = updater(DocsHandle::new(), lister.clone(), "http://unused", "old000");

        let (sha, changed) = u.check_for_update(&CancellationToken::new()).await.unwrap();
        assert_eq!(sha, "abc123");
        assert!(changed);
        assert_eq!(lister.calls(), 1);
    }

    #[tokio::test]
    async fn test_check_same_commit() {
        let lister = MockLister::with_main("abc123");
        let u = updater(DocsHandle::new(), lister, "http://unused", "abc123");

        let (sha, changed) = u.check_for_update(&CancellationToken::new()).await.unwrap();
        assert_eq!(sha, "abc123");
        assert!(!changed);
    }

    #[tokio::test]
    async fn test_check_missing_main_ref() {
        let lister = MockLister::with_main("abc123");
        lister.set_refs(HashMap::from([(
            "refs/heads/develop".to_string(),
            "def456".to_string(),
        )]));
        let u = updater(DocsHandle::new(), lister, "http://unused", "");

        let err = u.check_for_update(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "refs/heads/main not found in remote repository");
    }

    #[tokio::test]
    async fn test_check_empty_refs() {
        let lister = MockLister::with_main("abc123");
        lister.set_refs(HashMap::new());
        let u = updater(DocsHandle::new(), lister, "http://unused", "");

        let err = u.check_for_update(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DocsError::RefNotFound { .. }));
    }

    #[tokio::test]
    async fn test_check_lister_error_is_wrapped() {
        let u = updater(DocsHandle::new(), MockLister::failing("network error"), "http://unused", "");

        let err = u.check_for_update(&CancellationToken::new()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("failed to query remote refs"), "{message}");
        assert!(message.contains("network error"), "{message}");
    }

    #[tokio::test]
    async fn test_update_is_cancellable() {
        let lister = MockLister::blocking();
        let u = Arc::new(updater(DocsHandle::new(), lister.clone(), "http://unused", ""));
        let cancel = CancellationToken::new();

        let task = {
            let u = u.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { u.update(&cancel).await })
        };
        while lister.calls() == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("update did not observe cancellation")
            .unwrap();
        let err = result.unwrap_err();
        assert!(err.is_cancelled(), "{err}");
        assert_eq!(u.status().await.failures, 1);
    }

    #[tokio::test]
    async fn test_update_fetches_and_publishes_new_commit() {
        let server = ArchiveServer::start(
            StatusCode::OK,
            docs_archive(&[
                ("introduction/overview.md", "---\ntitle: Overview\n---\n# Overview\n\nPrometheus is a monitoring system."),
                ("querying/basics.md", "# Querying basics\n\nPromQL selects time series."),
            ]),
        )
        .await;
        let handle = DocsHandle::new();
        let u = updater(handle.clone(), MockLister::with_main("abc123"), &server.url, "");
        let cancel = CancellationToken::new();

        let outcome = u.update(&cancel).await.unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                old: String::new(),
                new: "abc123".into()
            }
        );
        assert_eq!(
            handle.list_docs().unwrap(),
            vec!["introduction/overview.md", "querying/basics.md"]
        );
        let overview = handle.read_doc("introduction/overview.md").unwrap();
        assert!(!overview.contains("title:"));
        assert_eq!(
            handle.search_docs("PromQL", 10).unwrap(),
            vec!["querying/basics.md#1"]
        );

        let status = u.status().await;
        assert_eq!(status.commit, "abc123");
        assert!(status.last_success.is_some());

        // Same commit again: no second download.
        let outcome = u.update(&cancel).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_known_commit_still_fetches_into_empty_handle() {
        let server = ArchiveServer::start(
            StatusCode::OK,
            docs_archive(&[("concepts/jobs.md", "# Jobs and instances")]),
        )
        .await;
        let handle = DocsHandle::new();
        let u = updater(handle.clone(), MockLister::with_main("abc123"), &server.url, "abc123");

        let outcome = u.update(&CancellationToken::new()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }), "{outcome:?}");
        assert_eq!(handle.list_docs().unwrap(), vec!["concepts/jobs.md"]);
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn test_initial_commit_requires_seeded_docs() {
        let config = DocsConfig {
            initial_commit: Some("abc123".to_string()),
            ..DocsConfig::default()
        };

        let unseeded = DocsUpdater::from_config(&config, DocsHandle::new()).unwrap();
        assert_eq!(unseeded.status.try_lock().unwrap().commit, "");

        let seeded =
            DocsUpdater::from_config(&config, seeded_handle(&[("a.md", "# A")])).unwrap();
        assert_eq!(seeded.status.try_lock().unwrap().commit, "abc123");
    }

    #[tokio::test]
    async fn test_http_error_keeps_old_docs() {
        let server = ArchiveServer::start(StatusCode::INTERNAL_SERVER_ERROR, b"boom".to_vec()).await;
        let handle = seeded_handle(&[("old.md", "# Old docs")]);
        let u = updater(handle.clone(), MockLister::with_main("abc123"), &server.url, "seed00");

        let err = u.update(&CancellationToken::new()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("failed to update docs to new commit abc123"), "{message}");
        assert!(message.contains("status 500"), "{message}");
        assert!(message.contains("boom"), "{message}");

        assert_eq!(handle.read_doc("old.md").unwrap(), "# Old docs");
        let status = u.status().await;
        assert_eq!(status.commit, "seed00");
        assert_eq!(status.failures, 1);
    }

    #[tokio::test]
    async fn test_invalid_archive_keeps_old_docs() {
        let server = ArchiveServer::start(StatusCode::OK, b"not a tarball".to_vec()).await;
        let handle = seeded_handle(&[("old.md", "# Old docs")]);
        let u = updater(handle.clone(), MockLister::with_main("abc123"), &server.url, "seed00");

        let err = u.fetch_and_update_docs(&CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("failed to extract docs from archive"));
        assert_eq!(handle.list_docs().unwrap(), vec!["old.md"]);
    }

    #[tokio::test]
    async fn test_download_size_cap() {
        let body = "x".repeat(4096);
        let archive = docs_archive(&[("big.md", body.as_str())]);
        let server = ArchiveServer::start(StatusCode::OK, archive).await;
        let handle = DocsHandle::new();
        let u = updater(handle.clone(), MockLister::with_main("abc123"), &server.url, "")
            .with_max_archive_size(16);

        let err = u.fetch_and_update_docs(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DocsError::DownloadTooLarge { limit: 16 }));
        assert!(!handle.is_ready());
    }

    #[tokio::test]
    async fn test_update_swaps_to_new_commit() {
        let server = ArchiveServer::start(StatusCode::OK, docs_archive(&[("old.md", "# Old")])).await;
        let lister = MockLister::with_main("commit1");
        let handle = DocsHandle::new();
        let u = updater(handle.clone(), lister.clone(), &server.url, "");
        let cancel = CancellationToken::new();

        u.update(&cancel).await.unwrap();
        assert_eq!(handle.list_docs().unwrap(), vec!["old.md"]);

        server.set(StatusCode::OK, docs_archive(&[("new.md", "# New")]));
        lister.set_refs(main_ref("commit2"));
        let outcome = u.update(&cancel).await.unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                old: "commit1".into(),
                new: "commit2".into()
            }
        );
        assert_eq!(handle.list_docs().unwrap(), vec!["new.md"]);
        assert!(handle.read_doc("old.md").unwrap_err().is_not_found());
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let server = ArchiveServer::start(StatusCode::OK, docs_archive(&[("a.md", "# A")])).await;
        let handle = DocsHandle::new();
        let u = Arc::new(updater(handle.clone(), MockLister::with_main("abc"), &server.url, ""));
        let cancel = CancellationToken::new();

        let task = {
            let u = u.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { u.run(Duration::from_secs(3600), cancel).await })
        };

        // The first cycle runs immediately.
        for _ in 0..200 {
            if handle.is_ready() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_ready());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("run loop did not stop")
            .unwrap();
    }
}
