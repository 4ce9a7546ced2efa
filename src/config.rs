//! TOML configuration.
//!
//! Every key has a default, so the server runs with no config file at all.
//! See `config/prometheus-mcp.example.toml` for a fully commented example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::updater::{DOCS_ARCHIVE_URL, DOCS_BRANCH, DOCS_REPO_URL};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_url")]
    pub url: String,
    #[serde(default = "default_prometheus_timeout")]
    pub timeout_secs: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: default_prometheus_url(),
            timeout_secs: default_prometheus_timeout(),
        }
    }
}

fn default_prometheus_url() -> String {
    "http://127.0.0.1:9090".to_string()
}
fn default_prometheus_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            bind: default_bind(),
        }
    }
}

fn default_transport() -> String {
    "stdio".to_string()
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ToolsConfig {
    /// Registers `snapshot`, `delete_series` and `clean_tombstones`.
    #[serde(default)]
    pub enable_tsdb_admin: bool,
    /// Restricts the Prometheus tools to these names. Empty means all.
    /// Docs tools are always registered.
    #[serde(default)]
    pub enabled: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_repo_url")]
    pub repo_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Local directory of markdown served until the first update lands.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Commit `local_path` was taken from; skips a redundant first download.
    /// Ignored when `local_path` is unset or fails to load.
    #[serde(default)]
    pub initial_commit: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_url: default_repo_url(),
            branch: default_branch(),
            archive_url: default_archive_url(),
            auto_update: true,
            update_interval_secs: default_update_interval(),
            http_timeout_secs: default_http_timeout(),
            local_path: None,
            initial_commit: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_repo_url() -> String {
    DOCS_REPO_URL.to_string()
}
fn default_branch() -> String {
    DOCS_BRANCH.to_string()
}
fn default_archive_url() -> String {
    DOCS_ARCHIVE_URL.to_string()
}
fn default_update_interval() -> u64 {
    24 * 60 * 60
}
fn default_http_timeout() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

/// Reads and validates a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Loads `path` if given, otherwise the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.prometheus.url.trim().is_empty() {
        anyhow::bail!("prometheus.url must not be empty");
    }
    if config.prometheus.timeout_secs == 0 {
        anyhow::bail!("prometheus.timeout_secs must be > 0");
    }

    match config.server.transport.as_str() {
        "stdio" | "http" => {}
        other => anyhow::bail!(
            "Unknown server transport: '{}'. Must be stdio or http.",
            other
        ),
    }

    if config.docs.enabled {
        if config.docs.update_interval_secs == 0 {
            anyhow::bail!("docs.update_interval_secs must be > 0");
        }
        if config.docs.http_timeout_secs == 0 {
            anyhow::bail!("docs.http_timeout_secs must be > 0");
        }
        if config.docs.branch.trim().is_empty() {
            anyhow::bail!("docs.branch must not be empty");
        }
    }

    match config.log.format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("Unknown log format: '{}'. Must be text or json.", other),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.prometheus.url, "http://127.0.0.1:9090");
        assert_eq!(config.server.transport, "stdio");
        assert!(config.docs.enabled);
        assert_eq!(config.docs.branch, "main");
        assert_eq!(config.docs.update_interval_secs, 86_400);
        assert_eq!(config.docs.http_timeout_secs, 300);
        assert!(!config.tools.enable_tsdb_admin);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = parse(
            r#"
            [prometheus]
            url = "http://prom:9090"

            [docs]
            local_path = "./docs"
            initial_commit = "abc123"
            "#,
        )
        .unwrap();
        assert_eq!(config.prometheus.url, "http://prom:9090");
        assert_eq!(config.prometheus.timeout_secs, 60);
        assert_eq!(config.docs.local_path, Some(PathBuf::from("./docs")));
        assert_eq!(config.docs.initial_commit.as_deref(), Some("abc123"));
        assert!(config.docs.auto_update);
    }

    #[test]
    fn test_rejects_unknown_transport() {
        let err = parse("[server]\ntransport = \"sse\"").unwrap_err();
        assert!(err.to_string().contains("Unknown server transport"));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = parse("[docs]\nupdate_interval_secs = 0").unwrap_err();
        assert!(err.to_string().contains("update_interval_secs"));
    }

    #[test]
    fn test_zero_interval_allowed_when_docs_disabled() {
        assert!(parse("[docs]\nenabled = false\nupdate_interval_secs = 0").is_ok());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(parse("[log]\nformat = \"xml\"").is_err());
    }
}
