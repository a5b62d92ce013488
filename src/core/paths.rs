use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Obsidian's per-vault settings folder, never searched.
pub const CONFIG_DIR: &str = ".obsidian";

#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("path must be relative to the vault: {0}")]
    Absolute(String),
    #[error("path escapes the vault: {0}")]
    Escapes(String),
}

#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub root: PathBuf,
    /// The root as the search tool sees it, when that differs (WSL + rg.exe).
    pub translated_root: Option<String>,
}

impl VaultPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            root,
            translated_root: None,
        }
    }

    pub fn with_translated_root(mut self, translated: Option<String>) -> Self {
        self.translated_root = translated;
        self
    }

    /// Joins a vault-relative path onto the root, refusing anything that
    /// could land outside it.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathError> {
        let candidate = Path::new(relative);
        let mut joined = self.root.clone();

        for component in candidate.components() {
            match component {
                Component::Normal(part) => joined.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(PathError::Escapes(relative.to_string())),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::Absolute(relative.to_string()))
                }
            }
        }

        Ok(joined)
    }

    pub fn search_root(&self, folder: Option<&str>) -> Result<PathBuf, PathError> {
        match folder.filter(|f| !f.trim().is_empty()) {
            Some(folder) => self.resolve(folder),
            None => Ok(self.root.clone()),
        }
    }

    /// Converts a path reported by the search tool back to a vault-relative
    /// one. Falls back to the translated root, then to the bare file name.
    pub fn relative_path(&self, reported: &str) -> String {
        if let Ok(rel) = Path::new(reported).strip_prefix(&self.root) {
            return rel.to_string_lossy().into_owned();
        }

        if let Some(translated) = &self.translated_root {
            let root = translated.replace('\\', "/");
            let normalized = reported.replace('\\', "/");
            if !root.is_empty() {
                if let Some(rest) = normalized.strip_prefix(root.trim_end_matches('/')) {
                    return rest.trim_start_matches('/').to_string();
                }
            }
        }

        Path::new(reported)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| reported.to_string())
    }
}
