//! MCP Server for Obsidian vault search
//!
//! Exposes the search operations as tools over stdio.

mod server;

pub use server::{run_mcp_server, VaultService};
