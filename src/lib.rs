//! # Prometheus MCP
//!
//! A Model Context Protocol server for Prometheus: PromQL queries, metric
//! discovery and TSDB administration as tools, plus a searchable, self
//! updating copy of the official Prometheus documentation.
//!
//! ## Architecture
//!
//! ```text
//!  prometheus/docs (git)          Prometheus server
//!        │ ls-remote + tar.gz            │ /api/v1/*
//!        ▼                               ▼
//! ┌──────────────┐              ┌────────────────┐
//! │ DocsUpdater  │              │ PrometheusApi  │
//! │ extract →    │              └───────┬────────┘
//! │ chunk/index  │                      │
//! └──────┬───────┘                      │
//!        ▼ publish                      │
//! ┌──────────────┐              ┌───────┴────────┐
//! │  DocsHandle  │─────────────▶│  ToolRegistry  │
//! └──────────────┘              └───────┬────────┘
//!                          ┌────────────┴────────────┐
//!                          ▼                         ▼
//!                   ┌────────────┐           ┌──────────────┐
//!                   │ MCP stdio  │           │ HTTP (axum)  │
//!                   └────────────┘           │ /tools, /mcp │
//!                                            └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`archive`] | Bounded extraction of docs from a `.tar.gz` |
//! | [`chunk`] | Markdown chunking and front matter stripping |
//! | [`config`] | TOML configuration parsing |
//! | [`docs`] | Immutable docs state and the swappable handle |
//! | [`error`] | Docs pipeline error type |
//! | [`index`] | In-memory full-text index over chunks |
//! | [`mcp`] | MCP bridge (tools and docs resources) |
//! | [`models`] | Chunk and virtual filesystem types |
//! | [`prometheus`] | Prometheus HTTP API client |
//! | [`refs`] | Remote git ref listing |
//! | [`server`] | JSON HTTP API and MCP Streamable HTTP |
//! | [`traits`] | Tool trait, context and built-in tools |
//! | [`updater`] | Background docs update cycle |

pub mod archive;
pub mod chunk;
pub mod config;
pub mod docs;
pub mod error;
pub mod index;
pub mod mcp;
pub mod models;
pub mod prometheus;
pub mod refs;
pub mod server;
pub mod traits;
pub mod updater;
