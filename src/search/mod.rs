//! Vault search backed by ripgrep
//!
//! `ripgrep` runs the tool, `events` decodes its JSON stream and `engine`
//! adds frontmatter scoping, smart context and link analysis on top.

pub mod engine;
pub mod events;
pub mod ripgrep;

pub use engine::{SearchEngine, SearchOptions, SearchScope};
pub use ripgrep::{Ripgrep, SearchBackend, SearchError, SearchRequest};
