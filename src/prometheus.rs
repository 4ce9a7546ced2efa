//! Prometheus HTTP API client.
//!
//! Every endpoint the tools use is described as an [`ApiRequest`] and sent
//! through the [`PrometheusApi`] trait, so tests can answer requests without
//! a real server. [`HttpPrometheusClient`] is the production implementation.
//!
//! Responses use the standard envelope:
//!
//! ```json
//! { "status": "success", "data": { ... }, "warnings": [] }
//! { "status": "error", "errorType": "bad_data", "error": "parse error ..." }
//! ```
//!
//! Callers receive only `data`; an `error` envelope becomes an `Err`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

/// A single call against `/api/v1/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            params: Vec::new(),
        }
    }

    fn post(path: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            params: Vec::new(),
        }
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    fn opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.param(key, v),
            _ => self,
        }
    }

    fn matchers(mut self, matches: &[String]) -> Self {
        for m in matches {
            self.params.push(("match[]".to_string(), m.clone()));
        }
        self
    }

    pub fn query(query: &str, time: Option<&str>) -> Self {
        Self::get("/api/v1/query")
            .param("query", query)
            .opt("time", time)
    }

    pub fn query_range(query: &str, start: &str, end: &str, step: &str) -> Self {
        Self::get("/api/v1/query_range")
            .param("query", query)
            .param("start", start)
            .param("end", end)
            .param("step", step)
    }

    pub fn label_names(matches: &[String], start: Option<&str>, end: Option<&str>) -> Self {
        Self::get("/api/v1/labels")
            .matchers(matches)
            .opt("start", start)
            .opt("end", end)
    }

    pub fn label_values(
        label: &str,
        matches: &[String],
        start: Option<&str>,
        end: Option<&str>,
    ) -> Self {
        Self::get(format!("/api/v1/label/{label}/values"))
            .matchers(matches)
            .opt("start", start)
            .opt("end", end)
    }

    pub fn series(matches: &[String], start: Option<&str>, end: Option<&str>) -> Self {
        Self::get("/api/v1/series")
            .matchers(matches)
            .opt("start", start)
            .opt("end", end)
    }

    pub fn metadata(metric: Option<&str>, limit: Option<u64>) -> Self {
        let request = Self::get("/api/v1/metadata").opt("metric", metric);
        match limit {
            Some(limit) => request.param("limit", limit.to_string()),
            None => request,
        }
    }

    pub fn query_exemplars(query: &str, start: &str, end: &str) -> Self {
        Self::get("/api/v1/query_exemplars")
            .param("query", query)
            .param("start", start)
            .param("end", end)
    }

    pub fn targets(state: Option<&str>) -> Self {
        Self::get("/api/v1/targets").opt("state", state)
    }

    pub fn targets_metadata(
        match_target: Option<&str>,
        metric: Option<&str>,
        limit: Option<u64>,
    ) -> Self {
        let request = Self::get("/api/v1/targets/metadata")
            .opt("match_target", match_target)
            .opt("metric", metric);
        match limit {
            Some(limit) if limit > 0 => request.param("limit", limit.to_string()),
            _ => request,
        }
    }

    pub fn alertmanagers() -> Self {
        Self::get("/api/v1/alertmanagers")
    }

    pub fn flags() -> Self {
        Self::get("/api/v1/status/flags")
    }

    pub fn config() -> Self {
        Self::get("/api/v1/status/config")
    }

    pub fn runtime_info() -> Self {
        Self::get("/api/v1/status/runtimeinfo")
    }

    pub fn wal_replay_status() -> Self {
        Self::get("/api/v1/status/walreplay")
    }

    pub fn healthy() -> Self {
        Self::get("/-/healthy")
    }

    pub fn ready() -> Self {
        Self::get("/-/ready")
    }

    /// Management endpoints (`/-/...`) answer with plain text, not the
    /// JSON envelope.
    pub fn is_management(&self) -> bool {
        self.path.starts_with("/-/")
    }

    pub fn alerts() -> Self {
        Self::get("/api/v1/alerts")
    }

    pub fn rules() -> Self {
        Self::get("/api/v1/rules")
    }

    pub fn tsdb_stats() -> Self {
        Self::get("/api/v1/status/tsdb")
    }

    pub fn build_info() -> Self {
        Self::get("/api/v1/status/buildinfo")
    }

    pub fn snapshot(skip_head: bool) -> Self {
        Self::post("/api/v1/admin/tsdb/snapshot").param("skip_head", skip_head.to_string())
    }

    pub fn delete_series(matches: &[String], start: Option<&str>, end: Option<&str>) -> Self {
        Self::post("/api/v1/admin/tsdb/delete_series")
            .matchers(matches)
            .opt("start", start)
            .opt("end", end)
    }

    pub fn clean_tombstones() -> Self {
        Self::post("/api/v1/admin/tsdb/clean_tombstones")
    }
}

/// Sends [`ApiRequest`]s to a Prometheus server.
#[async_trait]
pub trait PrometheusApi: Send + Sync {
    /// Returns the `data` member of a successful response, or `null` for
    /// endpoints that answer `204 No Content`.
    async fn call(&self, request: ApiRequest) -> Result<Value>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// [`PrometheusApi`] over HTTP.
pub struct HttpPrometheusClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("prometheus-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build Prometheus HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl PrometheusApi for HttpPrometheusClient {
    async fn call(&self, request: ApiRequest) -> Result<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(url = %url, "calling Prometheus API");

        let builder = match request.method {
            ApiMethod::Get => self.client.get(&url),
            ApiMethod::Post => self.client.post(&url),
        };
        let response = builder
            .query(&request.params)
            .send()
            .await
            .with_context(|| format!("request to {} failed", request.path))?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response from {}", request.path))?;

        if request.is_management() {
            if !status.is_success() {
                bail!(
                    "Prometheus management API {} returned status {}: {}",
                    request.path,
                    status.as_u16(),
                    body.trim()
                );
            }
            return Ok(Value::String(body.trim().to_string()));
        }

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                bail!("Prometheus returned status {}: {}", status.as_u16(), body.trim())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("invalid response from {}", request.path))
            }
        };

        if envelope.status != "success" {
            bail!(
                "Prometheus API error ({}): {}",
                envelope.error_type.as_deref().unwrap_or("unknown"),
                envelope.error.as_deref().unwrap_or("no error message")
            );
        }
        for warning in &envelope.warnings {
            warn!(path = %request.path, warning = %warning, "Prometheus API warning");
        }
        Ok(envelope.data)
    }
}
