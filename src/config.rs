//! Server configuration
//!
//! Loaded from the first JSON file found (or an explicit `--config`), then
//! overridden by environment variables, then by CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::operations::Defaults;

pub const ENV_VAULT_PATH: &str = "OBSIDIAN_VAULT_PATH";
pub const ENV_CASE_SENSITIVE: &str = "RGVAULT_CASE_SENSITIVE";
pub const ENV_RESULT_LIMIT: &str = "RGVAULT_RESULT_LIMIT";
pub const ENV_LOG: &str = "RGVAULT_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    Read(String, #[source] std::io::Error),

    #[error("failed to parse JSON in {0}: {1}")]
    Parse(String, #[source] serde_json::Error),

    #[error(
        "No vault path configured. Set OBSIDIAN_VAULT_PATH environment variable or create a config \
         file with 'vault_path' setting."
    )]
    MissingVaultPath,

    #[error("Vault path does not exist: {0}")]
    VaultNotFound(String),

    #[error("Vault path is not a directory: {0}")]
    VaultNotDirectory(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vault_path: Option<PathBuf>,
    pub default_case_sensitive: bool,
    pub default_result_limit: usize,
    /// Explicit ripgrep binary; PATH lookup when unset.
    pub rg_path: Option<PathBuf>,
    pub use_pcre2: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: None,
            default_case_sensitive: false,
            default_result_limit: 15,
            rg_path: None,
            use_pcre2: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// File, then environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                Self::from_file(path)?
            }
            None => match candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|e| ConfigError::Read(path.display().to_string(), e))?;
        serde_json::from_str(&s).map_err(|e| ConfigError::Parse(path.display().to_string(), e))
    }

    /// Applies environment overrides read through `var`. Unparseable
    /// values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var(ENV_VAULT_PATH).filter(|p| !p.is_empty()) {
            self.vault_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = var(ENV_CASE_SENSITIVE) {
            self.default_case_sensitive = matches!(flag.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(limit) = var(ENV_RESULT_LIMIT).and_then(|l| l.trim().parse().ok()) {
            self.default_result_limit = limit;
        }
        if let Some(level) = var(ENV_LOG).filter(|l| !l.is_empty()) {
            self.log_level = level;
        }
    }

    /// Checks the vault root and returns it canonicalized.
    pub fn validate(&self) -> Result<PathBuf, ConfigError> {
        let raw = self.vault_path.as_ref().ok_or(ConfigError::MissingVaultPath)?;
        if raw.as_os_str().is_empty() {
            return Err(ConfigError::MissingVaultPath);
        }
        let path = expand_home(raw);

        if !path.exists() {
            return Err(ConfigError::VaultNotFound(raw.display().to_string()));
        }
        if !path.is_dir() {
            return Err(ConfigError::VaultNotDirectory(raw.display().to_string()));
        }

        path.canonicalize()
            .map_err(|_| ConfigError::VaultNotFound(raw.display().to_string()))
    }

    pub fn defaults(&self) -> Defaults {
        Defaults {
            case_sensitive: self.default_case_sensitive,
            result_limit: self.default_result_limit,
        }
    }
}

/// Lookup order when no `--config` is given.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("rgvault.json")];
    if let Some(config_dir) = dirs::home_dir().map(|h| h.join(".config")) {
        paths.push(config_dir.join("rgvault").join("config.json"));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".rgvault.json"));
    }
    paths
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|h| h.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
