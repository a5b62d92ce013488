//! Vault MCP Server implementation

use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};

use crate::operations::{
    self, render, Defaults, GetFrontmatterRequest, SearchBacklinksRequest, SearchLinksRequest,
    SearchNotesRequest, SearchOrphanedNotesRequest, SearchRecentNotesRequest,
};
use crate::search::engine::SearchEngine;
use crate::vault::Vault;

/// Vault MCP Service
#[derive(Clone)]
pub struct VaultService {
    engine: Arc<SearchEngine>,
    defaults: Defaults,
    tool_router: ToolRouter<Self>,
}

impl VaultService {
    pub fn new(engine: SearchEngine, defaults: Defaults) -> Self {
        Self {
            engine: Arc::new(engine),
            defaults,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs a blocking operation off the async runtime and wraps its JSON.
    async fn run<F>(&self, op: F) -> Result<CallToolResult, McpError>
    where
        F: FnOnce(&SearchEngine, &Defaults) -> String + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let defaults = self.defaults;
        let output = tokio::task::spawn_blocking(move || op(&engine, &defaults))
            .await
            .map_err(|e| McpError::internal_error(format!("Search task failed: {}", e), None))?;

        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

#[tool_router]
impl VaultService {
    #[tool(description = "Search Obsidian notes with a regular expression. search_scope limits matches to YAML frontmatter (frontmatter_only) or the note body (content_only). With smart_context each match carries the frontmatter property or Markdown heading it belongs to. Uses Rust regex syntax; lookaround and backreferences only work in scoped searches when the server enables use_pcre2.")]
    async fn search_notes(
        &self,
        params: Parameters<SearchNotesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        tracing::debug!("search_notes {:?}", request);
        self.run(move |engine, defaults| render(operations::search_notes(engine, defaults, &request)))
            .await
    }

    #[tool(description = "Find links in the vault: wiki links ([[Note]]), Markdown links ([title](url)) and external URLs. Optionally filter by URL or title regex.")]
    async fn search_links(
        &self,
        params: Parameters<SearchLinksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        tracing::debug!("search_links {:?}", request);
        self.run(move |engine, defaults| render(operations::search_links(engine, defaults, &request)))
            .await
    }

    #[tool(description = "Find notes that link to the given note (path relative to the vault root), through wiki links or Markdown links. The note's links to itself are excluded.")]
    async fn search_backlinks(
        &self,
        params: Parameters<SearchBacklinksRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        tracing::debug!("search_backlinks {:?}", request);
        self.run(move |engine, defaults| render(operations::search_backlinks(engine, defaults, &request)))
            .await
    }

    #[tool(description = "List notes modified within an inclusive date range (YYYY-MM-DD), newest first.")]
    async fn search_recent_notes(
        &self,
        params: Parameters<SearchRecentNotesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        tracing::debug!("search_recent_notes {:?}", request);
        self.run(move |engine, defaults| {
            render(operations::search_recent_notes(engine, defaults, &request))
        })
        .await
    }

    #[tool(description = "Find notes with no outgoing links and no incoming links. Runs one search per candidate note, so keep max_results small on large vaults.")]
    async fn search_orphaned_notes(
        &self,
        params: Parameters<SearchOrphanedNotesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        tracing::debug!("search_orphaned_notes {:?}", request);
        self.run(move |engine, defaults| {
            render(operations::search_orphaned_notes(engine, defaults, &request))
        })
        .await
    }

    #[tool(description = "Get the parsed YAML frontmatter of a note as JSON (null when the note has none).")]
    async fn get_frontmatter(
        &self,
        params: Parameters<GetFrontmatterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let request = params.0;
        self.run(move |engine, _| render(operations::get_frontmatter(engine, &request)))
            .await
    }
}

#[tool_handler]
impl ServerHandler for VaultService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Obsidian vault search powered by ripgrep. Supports regex search scoped to frontmatter or body, link and backlink discovery, recently modified notes and orphaned notes.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(vault: Vault) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = VaultService::new(vault.engine, vault.defaults);
    let transport = (stdin(), stdout());
    tracing::info!("serving MCP over stdio");
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
