//! Tool trait, execution context, and the built-in tool set.
//!
//! Every capability the server exposes, whether documentation lookup or a
//! Prometheus API call, is a [`Tool`] registered in a [`ToolRegistry`].
//! Both transports (the JSON HTTP API in [`crate::server`] and the MCP
//! bridge in [`crate::mcp`]) dispatch through the same registry.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │               ToolRegistry                │
//! │  ┌──────────────┐  ┌───────────────────┐  │
//! │  │ Docs tools   │  │ Prometheus tools  │  │
//! │  │ list/read/   │  │ query, series,    │  │
//! │  │ search       │  │ targets, admin... │  │
//! │  └──────┬───────┘  └─────────┬─────────┘  │
//! └─────────┼────────────────────┼────────────┘
//!           ▼                    ▼
//!      DocsHandle          PrometheusApi
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::ToolsConfig;
use crate::docs::DocsHandle;
use crate::error::DocsError;
use crate::models::doc_name_from_key;
use crate::prometheus::{ApiRequest, PrometheusApi};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// Tools are listed via `GET /tools/list` and MCP `tools/list`, and invoked
/// via `POST /tools/{name}` and MCP `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores, e.g. `"range_query"`.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether the tool only reads. Admin tools that modify the TSDB
    /// return `false`.
    fn is_read_only(&self) -> bool {
        true
    }

    /// JSON Schema for the parameters (`type: "object"`).
    fn parameters_schema(&self) -> Value;

    /// Executes the tool. `params` is always a JSON object.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Everything a tool may touch while executing.
#[derive(Clone)]
pub struct ToolContext {
    pub docs: DocsHandle,
    pub prometheus: Arc<dyn PrometheusApi>,
}

impl ToolContext {
    pub fn new(docs: DocsHandle, prometheus: Arc<dyn PrometheusApi>) -> Self {
        Self { docs, prometheus }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Docs Tools
// ═══════════════════════════════════════════════════════════════════════

/// Lists every documentation file.
pub struct DocsListTool;

#[async_trait]
impl Tool for DocsListTool {
    fn name(&self) -> &str {
        "docs_list"
    }

    fn description(&self) -> &str {
        "List the files in the Prometheus documentation"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let files = ctx
            .docs
            .list_docs()
            .map_err(|e| anyhow::anyhow!("failed listing docs: {e}"))?;
        Ok(json!({ "files": files }))
    }
}

/// Reads one documentation file.
pub struct DocsReadTool;

#[async_trait]
impl Tool for DocsReadTool {
    fn name(&self) -> &str {
        "docs_read"
    }

    fn description(&self) -> &str {
        "Read a Prometheus documentation file by path (as returned by docs_list)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file": { "type": "string", "description": "Path of the doc file, e.g. querying/basics.md" }
            },
            "required": ["file"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let file = str_param(&params, "file").unwrap_or("");
        if file.trim().is_empty() {
            bail!("file parameter is required");
        }
        let content = ctx
            .docs
            .read_doc(file)
            .map_err(|e| anyhow::anyhow!("failed reading doc file: {e}"))?;
        Ok(json!({ "file": file, "content": content }))
    }
}

/// Full-text search over the documentation, returning whole files.
pub struct DocsSearchTool;

#[async_trait]
impl Tool for DocsSearchTool {
    fn name(&self) -> &str {
        "docs_search"
    }

    fn description(&self) -> &str {
        "Search the Prometheus documentation and return the matching files"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search terms (typos tolerated)" },
                "limit": { "type": "integer", "description": "Max chunks to match", "default": 10 }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = str_param(&params, "query").unwrap_or("");
        if query.trim().is_empty() {
            bail!("query parameter is required");
        }
        let limit = params["limit"].as_i64().unwrap_or(10);

        // Snapshot once so every file read comes from the generation searched.
        let state = ctx.docs.snapshot().ok_or_else(|| {
            anyhow::anyhow!(
                "failed searching docs for {query:?}: {}",
                DocsError::IndexNotInitialized
            )
        })?;
        let keys = state
            .search_docs(query, usize::try_from(limit).unwrap_or(0))
            .map_err(|e| anyhow::anyhow!("failed searching docs for {query:?}: {e}"))?;

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for key in &keys {
            let name = doc_name_from_key(key);
            if !seen.insert(name) {
                continue;
            }
            let content = state
                .read_doc(name)
                .map_err(|e| anyhow::anyhow!("failed reading doc file: {e}"))?;
            files.push(json!({ "file": name, "content": content }));
        }

        if files.is_empty() {
            return Ok(json!({
                "query": query,
                "files": [],
                "message": format!("No documentation found matching query: {query}")
            }));
        }
        Ok(json!({ "query": query, "files": files }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Prometheus Tools
// ═══════════════════════════════════════════════════════════════════════

type RequestBuilder = fn(&Value) -> Result<ApiRequest>;

/// A tool that maps its parameters onto one Prometheus API request and
/// returns the response `data`.
pub struct PrometheusTool {
    name: &'static str,
    description: &'static str,
    read_only: bool,
    schema: fn() -> Value,
    build: RequestBuilder,
}

#[async_trait]
impl Tool for PrometheusTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn parameters_schema(&self) -> Value {
        (self.schema)()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let request = (self.build)(&params)?;
        ctx.prometheus.call(request).await
    }
}

/// Read-only Prometheus API tools.
pub fn prometheus_tools() -> Vec<PrometheusTool> {
    vec![
        PrometheusTool {
            name: "query",
            description: "Execute an instant PromQL query",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "PromQL expression" },
                        "time": { "type": "string", "description": "Evaluation time (RFC3339 or unix seconds); defaults to now" }
                    },
                    "required": ["query"]
                })
            },
            build: |p| {
                let query = required_str(p, "query")?;
                Ok(ApiRequest::query(query, str_param(p, "time")))
            },
        },
        PrometheusTool {
            name: "range_query",
            description: "Execute a PromQL query over a time range",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "PromQL expression" },
                        "start": { "type": "string", "description": "Range start (RFC3339, unix seconds, or \"now\"); defaults to one hour before end" },
                        "end": { "type": "string", "description": "Range end; defaults to now" },
                        "step": { "type": "string", "description": "Resolution, e.g. 15s or 1m; derived from the range if omitted" }
                    },
                    "required": ["query"]
                })
            },
            build: |p| {
                let query = required_str(p, "query")?;
                let range = TimeRange::from_params(p, Utc::now())?;
                Ok(ApiRequest::query_range(
                    query,
                    &format_time(range.start),
                    &format_time(range.end),
                    &range.step,
                ))
            },
        },
        PrometheusTool {
            name: "exemplar_query",
            description: "Query exemplars for a PromQL expression over a time range",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "PromQL expression" },
                        "start": { "type": "string", "description": "Range start (RFC3339, unix seconds, or \"now\"); defaults to five minutes before end" },
                        "end": { "type": "string", "description": "Range end; defaults to now" }
                    },
                    "required": ["query"]
                })
            },
            build: |p| {
                let query = required_str(p, "query")?;
                let (start, end) = lookback_range(
                    p,
                    Utc::now(),
                    chrono::Duration::minutes(EXEMPLAR_LOOKBACK_MINUTES),
                )?;
                Ok(ApiRequest::query_exemplars(
                    query,
                    &format_time(start),
                    &format_time(end),
                ))
            },
        },
        PrometheusTool {
            name: "label_names",
            description: "List label names, optionally restricted by series selectors",
            read_only: true,
            schema: || matchers_schema(json!({}), &[]),
            build: |p| {
                Ok(ApiRequest::label_names(
                    &string_list(p, "matches")?,
                    str_param(p, "start"),
                    str_param(p, "end"),
                ))
            },
        },
        PrometheusTool {
            name: "label_values",
            description: "List the values of one label",
            read_only: true,
            schema: || {
                matchers_schema(
                    json!({ "label": { "type": "string", "description": "Label name, e.g. job" } }),
                    &["label"],
                )
            },
            build: |p| {
                let label = required_str(p, "label")?;
                if !is_valid_label_name(label) {
                    bail!("invalid label name: {label}");
                }
                Ok(ApiRequest::label_values(
                    label,
                    &string_list(p, "matches")?,
                    str_param(p, "start"),
                    str_param(p, "end"),
                ))
            },
        },
        PrometheusTool {
            name: "series",
            description: "Find series matching one or more selectors",
            read_only: true,
            schema: || matchers_schema(json!({}), &["matches"]),
            build: |p| {
                let matches = string_list(p, "matches")?;
                if matches.is_empty() {
                    bail!("matches must not be empty");
                }
                Ok(ApiRequest::series(
                    &matches,
                    str_param(p, "start"),
                    str_param(p, "end"),
                ))
            },
        },
        PrometheusTool {
            name: "metric_metadata",
            description: "Get type, help and unit metadata for metrics",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "metric": { "type": "string", "description": "Metric name; all metrics if omitted" },
                        "limit": { "type": "integer", "description": "Max metrics to return" }
                    }
                })
            },
            build: |p| {
                let limit = p["limit"].as_u64();
                Ok(ApiRequest::metadata(str_param(p, "metric"), limit))
            },
        },
        PrometheusTool {
            name: "targets",
            description: "List scrape targets and their health",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "state": { "type": "string", "enum": ["active", "dropped", "any"] }
                    }
                })
            },
            build: |p| Ok(ApiRequest::targets(str_param(p, "state"))),
        },
        PrometheusTool {
            name: "targets_metadata",
            description: "Get metric metadata as reported by scrape targets",
            read_only: true,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "match_target": { "type": "string", "description": "Label selector for targets, e.g. {job=\"node\"}; all targets if omitted" },
                        "metric": { "type": "string", "description": "Metric name; all metrics if omitted" },
                        "limit": { "type": "integer", "description": "Max targets to match" }
                    }
                })
            },
            build: |p| {
                Ok(ApiRequest::targets_metadata(
                    str_param(p, "match_target"),
                    str_param(p, "metric"),
                    p["limit"].as_u64(),
                ))
            },
        },
        no_param_tool("alerts", "List active alerts", |_| Ok(ApiRequest::alerts())),
        no_param_tool(
            "alertmanagers",
            "Get the state of Alertmanager discovery",
            |_| Ok(ApiRequest::alertmanagers()),
        ),
        no_param_tool("rules", "List alerting and recording rules", |_| {
            Ok(ApiRequest::rules())
        }),
        no_param_tool("tsdb_stats", "Get TSDB cardinality statistics", |_| {
            Ok(ApiRequest::tsdb_stats())
        }),
        no_param_tool(
            "build_info",
            "Get Prometheus version and build information",
            |_| Ok(ApiRequest::build_info()),
        ),
        no_param_tool("flags", "Get the flag values Prometheus was started with", |_| {
            Ok(ApiRequest::flags())
        }),
        no_param_tool("config", "Get the loaded Prometheus configuration (YAML)", |_| {
            Ok(ApiRequest::config())
        }),
        no_param_tool("runtime_info", "Get Prometheus runtime information", |_| {
            Ok(ApiRequest::runtime_info())
        }),
        no_param_tool("wal_replay_status", "Get the WAL replay status", |_| {
            Ok(ApiRequest::wal_replay_status())
        }),
        no_param_tool("healthy", "Check whether Prometheus is healthy", |_| {
            Ok(ApiRequest::healthy())
        }),
        no_param_tool(
            "ready",
            "Check whether Prometheus is ready to serve queries",
            |_| Ok(ApiRequest::ready()),
        ),
    ]
}

/// TSDB admin tools. These modify or snapshot the TSDB.
pub fn tsdb_admin_tools() -> Vec<PrometheusTool> {
    vec![
        PrometheusTool {
            name: "snapshot",
            description: "Create a TSDB snapshot (requires --web.enable-admin-api)",
            read_only: false,
            schema: || {
                json!({
                    "type": "object",
                    "properties": {
                        "skip_head": { "type": "boolean", "description": "Skip data in the head block", "default": false }
                    }
                })
            },
            build: |p| Ok(ApiRequest::snapshot(p["skip_head"].as_bool().unwrap_or(false))),
        },
        PrometheusTool {
            name: "delete_series",
            description: "Delete series matching selectors (requires --web.enable-admin-api)",
            read_only: false,
            schema: || matchers_schema(json!({}), &["matches"]),
            build: |p| {
                let matches = string_list(p, "matches")?;
                if matches.is_empty() {
                    bail!("matches must not be empty");
                }
                Ok(ApiRequest::delete_series(
                    &matches,
                    str_param(p, "start"),
                    str_param(p, "end"),
                ))
            },
        },
        PrometheusTool {
            name: "clean_tombstones",
            description: "Remove deleted data from disk (requires --web.enable-admin-api)",
            read_only: false,
            schema: || json!({ "type": "object", "properties": {} }),
            build: |_| Ok(ApiRequest::clean_tombstones()),
        },
    ]
}

fn no_param_tool(
    name: &'static str,
    description: &'static str,
    build: RequestBuilder,
) -> PrometheusTool {
    PrometheusTool {
        name,
        description,
        read_only: true,
        schema: || json!({ "type": "object", "properties": {} }),
        build,
    }
}

/// Schema with `matches`/`start`/`end` plus any `extra` properties.
fn matchers_schema(extra: Value, required: &[&str]) -> Value {
    let mut properties = json!({
        "matches": {
            "type": "array",
            "items": { "type": "string" },
            "description": "Series selectors, e.g. [\"up{job=\\\"node\\\"}\"]"
        },
        "start": { "type": "string", "description": "Start time (RFC3339 or unix seconds)" },
        "end": { "type": "string", "description": "End time (RFC3339 or unix seconds)" }
    });
    if let (Some(props), Value::Object(extra)) = (properties.as_object_mut(), extra) {
        props.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter helpers
// ═══════════════════════════════════════════════════════════════════════

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    match str_param(params, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => bail!("{key} must not be empty"),
    }
}

fn string_list(params: &Value, key: &str) -> Result<Vec<String>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v.as_str() {
                Some(s) => Ok(s.to_string()),
                None => bail!("invalid {key}: expected an array of strings"),
            })
            .collect(),
        Some(_) => bail!("invalid {key}: expected an array of strings"),
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Points per range query when no step is given.
const AUTO_STEP_POINTS: i64 = 250;

/// Resolved `start`/`end`/`step` of a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: String,
}

impl TimeRange {
    fn from_params(params: &Value, now: DateTime<Utc>) -> Result<Self> {
        let (start, end) = lookback_range(params, now, chrono::Duration::hours(1))?;
        let step = match str_param(params, "step") {
            Some(s) => s.to_string(),
            None => {
                let secs = (end - start).num_seconds() / AUTO_STEP_POINTS;
                format!("{}s", secs.max(1))
            }
        };
        Ok(Self { start, end, step })
    }
}

/// Minutes an exemplar query looks back when no start is given.
const EXEMPLAR_LOOKBACK_MINUTES: i64 = 5;

/// `start`/`end` with `end` defaulting to now and `start` to `end - lookback`.
fn lookback_range(
    params: &Value,
    now: DateTime<Utc>,
    lookback: chrono::Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = match str_param(params, "end") {
        Some(s) => parse_time(s, now)?,
        None => now,
    };
    let start = match str_param(params, "start") {
        Some(s) => parse_time(s, now)?,
        None => end - lookback,
    };
    if start > end {
        bail!("invalid time range: start is after end");
    }
    Ok((start, end))
}

/// Parses `"now"`, RFC 3339, or (fractional) unix seconds.
pub fn parse_time(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Some(secs) = value.parse::<f64>().ok().filter(|s| s.is_finite()) {
        let millis = (secs * 1000.0).round() as i64;
        if let Some(t) = Utc.timestamp_millis_opt(millis).single() {
            return Ok(t);
        }
    }
    bail!("invalid timestamp: {value}")
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of callable tools, in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the docs tools and the Prometheus tools `config` allows.
    pub fn with_builtins(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DocsListTool));
        registry.register(Box::new(DocsReadTool));
        registry.register(Box::new(DocsSearchTool));

        let allowed = |name: &str| config.enabled.is_empty() || config.enabled.iter().any(|n| n == name);
        for tool in prometheus_tools() {
            if allowed(tool.name) {
                registry.register(Box::new(tool));
            }
        }
        if config.enable_tsdb_admin {
            for tool in tsdb_admin_tools() {
                if allowed(tool.name) {
                    registry.register(Box::new(tool));
                }
            }
        }
        registry
    }

    /// Register a tool. A later tool with the same name shadows nothing;
    /// [`find`](Self::find) returns the first match.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
