//! Startup: configuration to a ready search engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::operations::Defaults;
use crate::search::engine::{SearchEngine, SearchOptions};
use crate::search::ripgrep::{Ripgrep, SearchError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

pub struct Vault {
    pub root: PathBuf,
    pub engine: SearchEngine,
    pub defaults: Defaults,
    pub rg_binary: PathBuf,
    pub rg_version: String,
}

impl Vault {
    /// Validates the vault root and locates ripgrep. Either failing is
    /// fatal.
    pub fn open(config: &Config) -> Result<Self, StartupError> {
        let root = config.validate()?;
        tracing::info!("vault path: {}", root.display());

        let rg = Ripgrep::locate(&root, config.rg_path.as_deref())?;
        let rg_binary = rg.binary().to_path_buf();
        let rg_version = rg.version().to_string();
        tracing::info!("ripgrep: {} (version {})", rg_binary.display(), rg_version);

        let paths = rg.paths().clone();
        let engine = SearchEngine::new(paths, Box::new(rg)).with_pcre2(config.use_pcre2);

        Ok(Self {
            root,
            engine,
            defaults: config.defaults(),
            rg_binary,
            rg_version,
        })
    }

    /// One-result search to confirm the tool runs against this vault.
    pub fn smoke_test(&self) -> usize {
        let options = SearchOptions {
            max_results: 1,
            smart_context: false,
            ..Default::default()
        };
        let count = self.engine.search("test", &options).len();
        tracing::info!("test search returned {} results", count);
        count
    }
}
