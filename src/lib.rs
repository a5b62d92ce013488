//! rgvault library
//!
//! Fast regex search over an Obsidian vault using ripgrep, aware of YAML
//! frontmatter, headings and links.
//!
//! # Modules
//!
//! - `core`: Vault primitives (paths, frontmatter, smart context, links, file metadata)
//! - `search`: ripgrep boundary and the search engine
//! - `operations`: The served operations and their JSON reports
//! - `config`: Configuration file and environment loading
//! - `mcp`: MCP server over stdio

pub mod config;
pub mod core;
pub mod logging;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod operations;
pub mod search;
pub mod vault;

// Re-exports for convenience
pub use config::{Config, ConfigError};
pub use crate::core::links::{LinkFilter, LinkKind, LinkMatch, LinkType};
pub use crate::core::note::{DateRange, FileInfo};
pub use crate::core::paths::VaultPaths;
pub use crate::core::record::{EnrichedMatch, MatchRecord};
pub use operations::{Defaults, InputError};
pub use search::{SearchEngine, SearchOptions, SearchScope};
pub use vault::Vault;
