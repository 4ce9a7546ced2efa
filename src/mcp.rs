//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] and the docs corpus to the Model Context
//! Protocol:
//!
//! * **Tools** are exposed via `list_tools` / `call_tool`.
//! * **Docs** are exposed as resources: `prometheus://docs` lists every file,
//!   and `prometheus://docs/<path>` returns one file's markdown.
//!
//! The bridge is served over stdio by [`serve_stdio`] and over streamable
//! HTTP at `/mcp` by [`crate::server`].

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Context;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tracing::info;

use crate::traits::{ToolContext, ToolRegistry};

/// URI of the docs index resource.
pub const DOCS_INDEX_URI: &str = "prometheus://docs";

const DOCS_URI_PREFIX: &str = "prometheus://docs/";

/// Bridges the tool registry and docs handle to MCP.
///
/// Each MCP session receives a clone (everything is behind `Arc`).
#[derive(Clone)]
pub struct McpBridge {
    ctx: Arc<ToolContext>,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(ctx: Arc<ToolContext>, tools: Arc<ToolRegistry>) -> Self {
        Self { ctx, tools }
    }

    /// Convert a registry tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let input_schema = match tool.parameters_schema() {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(tool.is_read_only())),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    fn docs_resources(&self) -> Result<Vec<Resource>, McpError> {
        let files = self
            .ctx
            .docs
            .list_docs()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let mut index = RawResource::new(DOCS_INDEX_URI, "Prometheus documentation index");
        index.description = Some("Newline-separated list of documentation files".to_string());
        index.mime_type = Some("text/plain".to_string());

        let mut resources = vec![index.no_annotation()];
        for file in files {
            let mut doc = RawResource::new(format!("{DOCS_URI_PREFIX}{file}"), file.clone());
            doc.mime_type = Some("text/markdown".to_string());
            resources.push(doc.no_annotation());
        }
        Ok(resources)
    }

    fn read_docs_resource(&self, uri: &str) -> Result<String, McpError> {
        if uri == DOCS_INDEX_URI {
            let files = self
                .ctx
                .docs
                .list_docs()
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            return Ok(files.join("\n"));
        }

        let file = uri
            .strip_prefix(DOCS_URI_PREFIX)
            .filter(|f| !f.is_empty())
            .and_then(percent_decode)
            .ok_or_else(|| McpError::resource_not_found(format!("unknown resource: {uri}"), None))?;

        self.ctx.docs.read_doc(&file).map_err(|e| {
            if e.is_not_found() {
                McpError::resource_not_found(e.to_string(), None)
            } else {
                McpError::internal_error(format!("failed reading doc file: {e}"), None)
            }
        })
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "prometheus-mcp".to_string(),
                title: Some("Prometheus MCP".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Prometheus MCP server. Use query and range_query to run PromQL, the label, \
                 series and metadata tools to discover metrics, and docs_search / docs_read \
                 to consult the official Prometheus documentation."
                    .to_string(),
            ),
        }
    }

    // ── Tools ────────────────────────────────────────────────────────────

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match tool.execute(params, &self.ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    // ── Resources (docs) ─────────────────────────────────────────────────

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(self.docs_resources().map(ListResourcesResult::with_all_items))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = self.read_docs_resource(&request.uri)?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri.clone())],
        })
    }
}

/// Serves the bridge over stdin/stdout until the client disconnects.
pub async fn serve_stdio(bridge: McpBridge) -> anyhow::Result<()> {
    info!("serving MCP over stdio");
    let service = bridge
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

/// Decodes `%XX` escapes in a resource path. `None` on a malformed escape
/// or non-UTF-8 result.
fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return Some(s.to_string());
    }

    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex(*bytes.get(i + 1)?)?;
            let lo = hex(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use crate::docs::{DocsHandle, DocsState};
    use crate::models::DocsFs;
    use crate::prometheus::HttpPrometheusClient;

    fn bridge() -> McpBridge {
        let mut fs = DocsFs::new();
        fs.insert(
            "concepts/metric_types.md",
            b"---\ntitle: Metric types\n---\n# Metric types\n\nCounters only go up.".to_vec(),
        );
        fs.insert("index.md", b"# Prometheus".to_vec());
        fs.insert("guides/basic auth.md", b"# Basic auth".to_vec());
        let docs = DocsHandle::with_state(DocsState::build(fs).unwrap());
        let prometheus = Arc::new(
            HttpPrometheusClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1))
                .unwrap(),
        );
        let ctx = ToolContext::new(docs, prometheus);
        McpBridge::new(
            Arc::new(ctx),
            Arc::new(ToolRegistry::with_builtins(&ToolsConfig::default())),
        )
    }

    #[test]
    fn test_index_resource_lists_files() {
        let text = bridge().read_docs_resource(DOCS_INDEX_URI).unwrap();
        assert_eq!(text, "concepts/metric_types.md\nguides/basic auth.md\nindex.md");
    }

    #[test]
    fn test_doc_resource_strips_front_matter() {
        let text = bridge()
            .read_docs_resource("prometheus://docs/concepts/metric_types.md")
            .unwrap();
        assert!(text.starts_with("# Metric types"));
        assert!(!text.contains("title:"));
    }

    #[test]
    fn test_doc_resource_uri_is_percent_decoded() {
        let bridge = bridge();
        let text = bridge
            .read_docs_resource("prometheus://docs/guides/basic%20auth.md")
            .unwrap();
        assert_eq!(text, "# Basic auth");
        assert!(bridge.read_docs_resource("prometheus://docs/guides/basic%2").is_err());
        assert!(bridge.read_docs_resource("prometheus://docs/%ff.md").is_err());
    }

    #[test]
    fn test_unknown_resources() {
        let bridge = bridge();
        assert!(bridge.read_docs_resource("prometheus://docs/missing.md").is_err());
        assert!(bridge.read_docs_resource("prometheus://docs/").is_err());
        assert!(bridge.read_docs_resource("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_resource_listing_includes_index_and_docs() {
        let resources = bridge().docs_resources().unwrap();
        let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(
            uris,
            vec![
                "prometheus://docs",
                "prometheus://docs/concepts/metric_types.md",
                "prometheus://docs/guides/basic auth.md",
                "prometheus://docs/index.md"
            ]
        );
    }

    #[test]
    fn test_tool_annotations_follow_read_only() {
        let registry = ToolRegistry::with_builtins(&ToolsConfig {
            enable_tsdb_admin: true,
            enabled: Vec::new(),
        });
        let snapshot = McpBridge::to_mcp_tool(registry.find("snapshot").unwrap());
        assert_eq!(snapshot.annotations.and_then(|a| a.read_only_hint), Some(false));
        let query = McpBridge::to_mcp_tool(registry.find("query").unwrap());
        assert_eq!(query.annotations.and_then(|a| a.read_only_hint), Some(true));
    }
}
