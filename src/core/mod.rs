//! Vault-side logic: frontmatter, smart context, links, note metadata.

pub mod context;
pub mod frontmatter;
pub mod links;
pub mod note;
pub mod paths;
pub mod record;
