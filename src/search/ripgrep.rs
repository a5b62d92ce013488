//! The external search tool boundary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use super::events::parse_matches;
use crate::core::paths::{PathError, VaultPaths, CONFIG_DIR};
use crate::core::record::MatchRecord;

const CANDIDATES: [&str; 2] = ["rg", "rg.exe"];

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(
        "ripgrep (rg) is not installed or not in PATH. Install ripgrep and make sure it is on \
         PATH (on Windows: winget install BurntSushi.ripgrep.MSVC)"
    )]
    ToolNotFound,
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("search tool exited with {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },
    #[error(transparent)]
    Path(#[from] PathError),
}

/// One invocation of the search tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    pub pattern: &'a str,
    pub case_sensitive: bool,
    pub folder: Option<&'a str>,
    /// Per-file match cap.
    pub max_count: usize,
    pub pcre2: bool,
}

/// Anything that can turn a request into vault-relative match records in
/// newest-file-first, in-file line order.
pub trait SearchBackend: Send + Sync {
    fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<MatchRecord>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct Ripgrep {
    binary: PathBuf,
    version: String,
    paths: VaultPaths,
}

impl Ripgrep {
    /// Finds a working `rg` binary: `explicit` if given, otherwise `rg` or
    /// `rg.exe` on PATH.
    pub fn locate(vault_root: &Path, explicit: Option<&Path>) -> Result<Self, SearchError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => CANDIDATES
                .iter()
                .filter_map(|name| which::which(name).ok())
                .collect(),
        };

        for binary in candidates {
            if let Some(version) = probe_version(&binary) {
                tracing::info!("found ripgrep: {} ({})", binary.display(), version);
                let paths = VaultPaths::from_root(vault_root.to_path_buf());
                let translated = translate_path(&binary, vault_root);
                return Ok(Self {
                    binary,
                    version,
                    paths: paths.with_translated_root(translated),
                });
            }
        }

        Err(SearchError::ToolNotFound)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn args_for(&self, request: &SearchRequest<'_>) -> Result<Vec<OsString>, SearchError> {
        let search_path = self.paths.search_root(request.folder)?;
        Ok(build_args(request, &self.search_path_arg(&search_path)))
    }

    fn search_path_arg(&self, path: &Path) -> OsString {
        translate_path(&self.binary, path)
            .map(OsString::from)
            .unwrap_or_else(|| path.as_os_str().to_os_string())
    }
}

pub fn build_args(request: &SearchRequest<'_>, search_path: &std::ffi::OsStr) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    if !request.case_sensitive {
        args.push("--ignore-case".into());
    }
    args.push("--json".into());
    args.push("--max-count".into());
    args.push(request.max_count.to_string().into());
    args.push("--glob".into());
    args.push("*.md".into());
    args.push("--glob".into());
    args.push(format!("!{}/**", CONFIG_DIR).into());
    args.push("--sortr".into());
    args.push("modified".into());
    if request.pcre2 {
        args.push("--pcre2".into());
    }
    args.push("--regexp".into());
    args.push(request.pattern.into());
    args.push(search_path.to_os_string());

    args
}

impl SearchBackend for Ripgrep {
    fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<MatchRecord>, SearchError> {
        let args = self.args_for(request)?;
        tracing::debug!("running {} {:?}", self.binary.display(), args);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SearchError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!("rg stderr: {}", stderr.trim());
        }

        match output.status.code() {
            Some(0) => {}
            // 1 means the search ran and found nothing
            Some(1) => return Ok(Vec::new()),
            code => {
                return Err(SearchError::ToolFailed {
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = parse_matches(&stdout, |p| self.paths.relative_path(p));
        tracing::debug!("rg returned {} matches", records.len());
        Ok(records)
    }
}

fn probe_version(binary: &Path) -> Option<String> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?;
    Some(first.split_whitespace().nth(1).unwrap_or(first).to_string())
}

fn running_under_wsl() -> bool {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| {
            let release = release.to_lowercase();
            release.contains("microsoft") || release.contains("wsl")
        })
        .unwrap_or(false)
}

/// Windows form of `path` when a Windows `rg.exe` is driven from WSL.
fn translate_path(binary: &Path, path: &Path) -> Option<String> {
    let is_exe = binary
        .extension()
        .map(|e| e.eq_ignore_ascii_case("exe"))
        .unwrap_or(false);
    if !cfg!(target_os = "linux") || !is_exe || !running_under_wsl() {
        return None;
    }

    let output = Command::new("wslpath")
        .arg("-w")
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let translated = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!translated.is_empty()).then_some(translated)
}
