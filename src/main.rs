//! # Prometheus MCP server (`prometheus-mcp-server`)
//!
//! Serves Prometheus tools and the Prometheus documentation to MCP clients,
//! and offers a few CLI commands for working with the docs directly.
//!
//! ## Usage
//!
//! ```bash
//! prometheus-mcp-server --config ./config/prometheus-mcp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` | Run the MCP server (stdio or HTTP) |
//! | `docs list` | List documentation files |
//! | `docs read <file>` | Print one documentation file |
//! | `docs search "<query>"` | Search the documentation |
//! | `docs check` | Show the latest upstream docs commit |
//!
//! ## Examples
//!
//! ```bash
//! # MCP over stdio (for editors and desktop clients)
//! prometheus-mcp-server serve
//!
//! # JSON tool API and MCP Streamable HTTP on port 8080
//! prometheus-mcp-server serve --transport http --bind 0.0.0.0:8080
//!
//! # Search the docs from a local checkout
//! prometheus-mcp-server docs search "histogram_quantile"
//! ```
//!
//! Logs always go to stderr; stdout is reserved for MCP traffic and
//! command output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use prometheus_mcp::config::{self, Config, DocsConfig, LogConfig};
use prometheus_mcp::docs::{DocsHandle, DocsState};
use prometheus_mcp::mcp::{serve_stdio, McpBridge};
use prometheus_mcp::prometheus::HttpPrometheusClient;
use prometheus_mcp::server::run_server;
use prometheus_mcp::traits::{ToolContext, ToolRegistry};
use prometheus_mcp::updater::{DocsUpdater, UpdateOutcome};

/// Prometheus MCP server: PromQL tools and searchable Prometheus docs for AI
/// assistants.
#[derive(Parser)]
#[command(
    name = "prometheus-mcp-server",
    about = "MCP server exposing the Prometheus API and documentation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive; overrides `[log].level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server.
    Serve {
        /// `stdio` or `http`; overrides `[server].transport`.
        #[arg(long)]
        transport: Option<String>,

        /// Listen address for the HTTP transport; overrides `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Work with the documentation corpus.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List every documentation file.
    List,

    /// Print a documentation file (front matter stripped).
    Read {
        /// Path as printed by `docs list`, e.g. `querying/basics.md`.
        file: String,
    },

    /// Full-text search; prints matching chunk keys (`file#n`).
    Search {
        query: String,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Query the upstream repository for its latest docs commit.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_or_default(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }
    init_tracing(&cfg.log);

    match cli.command {
        Commands::Serve { transport, bind } => {
            if let Some(transport) = transport {
                cfg.server.transport = transport;
            }
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            serve(cfg).await?;
        }
        Commands::Docs { action } => run_docs(&cfg, action).await?,
    }

    Ok(())
}

/// `RUST_LOG`, when set, wins over the configured level.
fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    let docs = DocsHandle::new();

    if cfg.docs.enabled {
        seed_local_docs(&cfg.docs, &docs).await;
        spawn_docs_updates(&cfg.docs, &docs, cancel.clone())?;
    }

    let prometheus = Arc::new(HttpPrometheusClient::new(
        &cfg.prometheus.url,
        Duration::from_secs(cfg.prometheus.timeout_secs),
    )?);
    let tools = Arc::new(ToolRegistry::with_builtins(&cfg.tools));
    info!(
        prometheus = %cfg.prometheus.url,
        tools = tools.len(),
        transport = %cfg.server.transport,
        "starting Prometheus MCP server"
    );

    let ctx = Arc::new(ToolContext::new(docs, prometheus));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
        shutdown.cancel();
    });

    let result = match cfg.server.transport.as_str() {
        "http" => run_server(&cfg.server.bind, ctx, tools, cancel.clone()).await,
        _ => {
            let bridge = McpBridge::new(ctx, tools);
            tokio::select! {
                result = serve_stdio(bridge) => result,
                _ = cancel.cancelled() => Ok(()),
            }
        }
    };
    cancel.cancel();
    result
}

/// Publishes `docs.local_path`, if configured. Failure is logged, not fatal:
/// the updater can still fill the handle.
async fn seed_local_docs(docs_cfg: &DocsConfig, handle: &DocsHandle) {
    let Some(root) = docs_cfg.local_path.clone() else {
        return;
    };
    let root_display = root.display().to_string();
    match tokio::task::spawn_blocking(move || DocsState::load_dir(&root)).await {
        Ok(Ok(state)) => {
            info!(path = %root_display, files = state.fs().len(), "loaded local docs");
            handle.publish(state);
        }
        Ok(Err(e)) => error!(path = %root_display, error = %e, "failed to load local docs"),
        Err(e) => error!(path = %root_display, error = %e, "local docs task failed"),
    }
}

/// Starts the periodic updater, or a single fetch when auto update is off
/// and nothing has been published yet.
fn spawn_docs_updates(
    docs_cfg: &DocsConfig,
    handle: &DocsHandle,
    cancel: CancellationToken,
) -> Result<()> {
    let updater = DocsUpdater::from_config(docs_cfg, handle.clone())
        .context("failed to create docs updater")?;

    if docs_cfg.auto_update {
        let interval = Duration::from_secs(docs_cfg.update_interval_secs);
        tokio::spawn(async move { updater.run(interval, cancel).await });
    } else if !handle.is_ready() {
        tokio::spawn(async move {
            if let Err(e) = updater.update(&cancel).await {
                error!(error = %e, "initial docs fetch failed");
            }
        });
    }
    Ok(())
}

async fn run_docs(cfg: &Config, action: DocsAction) -> Result<()> {
    let cancel = CancellationToken::new();
    let handle = DocsHandle::new();

    if let DocsAction::Check = action {
        let updater = DocsUpdater::from_config(&cfg.docs, handle)?;
        let (commit, _) = updater.check_for_update(&cancel).await?;
        println!("{} {}", cfg.docs.branch, commit);
        if let Some(initial) = &cfg.docs.initial_commit {
            let changed = *initial != commit;
            println!("{}", if changed { "update available" } else { "up to date" });
        }
        return Ok(());
    }

    load_docs_once(cfg, &handle, &cancel).await?;

    match action {
        DocsAction::List => {
            for file in handle.list_docs()? {
                println!("{file}");
            }
        }
        DocsAction::Read { file } => {
            println!("{}", handle.read_doc(&file)?);
        }
        DocsAction::Search { query, limit } => {
            let keys = handle.search_docs(&query, limit.unwrap_or(0))?;
            if keys.is_empty() {
                println!("No documentation found matching query: {query}");
            }
            for key in keys {
                println!("{key}");
            }
        }
        DocsAction::Check => {}
    }
    Ok(())
}

/// Fills `handle` from `docs.local_path`, or downloads the archive.
async fn load_docs_once(
    cfg: &Config,
    handle: &DocsHandle,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(root) = cfg.docs.local_path.clone() {
        let state = tokio::task::spawn_blocking(move || DocsState::load_dir(&root))
            .await
            .context("local docs task failed")??;
        handle.publish(state);
        return Ok(());
    }

    let mut docs_cfg = cfg.docs.clone();
    docs_cfg.initial_commit = None;
    let updater = DocsUpdater::from_config(&docs_cfg, handle.clone())?;
    match updater.update(cancel).await? {
        UpdateOutcome::Updated { new, .. } => info!(commit = %new, "downloaded docs"),
        UpdateOutcome::UpToDate { .. } => {}
    }
    Ok(())
}
