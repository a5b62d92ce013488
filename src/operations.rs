//! Served operations
//!
//! Each operation validates its request, runs the engine, and returns a
//! serializable report. The MCP tools and CLI commands are thin wrappers
//! around these functions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::links::{LinkFilter, LinkMatch, LinkType};
use crate::core::note::{parse_date, DateRange, FileInfo};
use crate::core::paths::PathError;
use crate::search::engine::{SearchEngine, SearchOptions, SearchScope};

pub const MIN_RESULTS: i64 = 1;
pub const MAX_RESULTS: i64 = 100;

/// Bad caller input. Rendered as `{"error": "<message>"}`.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("Invalid search_scope. Use: all, content_only, or frontmatter_only")]
    SearchScope(String),
    #[error("Invalid link_type. Use: all, wiki_links, markdown_links, external_urls")]
    LinkType(String),
    #[error("Invalid {field}: {message}")]
    Pattern { field: &'static str, message: String },
    #[error("Invalid start_date format: '{0}'. Expected YYYY-MM-DD format (e.g., '2024-01-15')")]
    StartDate(String),
    #[error("Invalid end_date format: '{0}'. Expected YYYY-MM-DD format (e.g., '2024-01-31')")]
    EndDate(String),
    #[error("Invalid folder: {0}")]
    Folder(PathError),
    #[error("Invalid file: {0}")]
    File(PathError),
}

/// Fallbacks for parameters the caller leaves out.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    pub case_sensitive: bool,
    pub result_limit: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            result_limit: 15,
        }
    }
}

impl Defaults {
    fn case_sensitive(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(self.case_sensitive)
    }

    fn max_results(&self, requested: Option<i64>) -> usize {
        clamp_max_results(requested.unwrap_or(self.result_limit as i64))
    }
}

/// Out-of-range limits are capped, never rejected.
pub fn clamp_max_results(requested: i64) -> usize {
    requested.clamp(MIN_RESULTS, MAX_RESULTS) as usize
}

fn check_folder(engine: &SearchEngine, folder: Option<&str>) -> Result<(), InputError> {
    engine
        .paths()
        .search_root(folder)
        .map(|_| ())
        .map_err(InputError::Folder)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchNotesRequest {
    /// Search pattern (regular expression)
    pub query: String,
    /// Where to search: "all", "content_only", or "frontmatter_only" (default: all)
    #[serde(default)]
    pub search_scope: Option<String>,
    /// Whether the search is case sensitive (default: configured default)
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Folder, relative to the vault root, to limit the search to
    #[serde(default)]
    pub folder: Option<String>,
    /// Maximum number of results, capped to 1..=100 (default: configured limit)
    #[serde(default)]
    pub max_results: Option<i64>,
    /// Include the frontmatter property or heading each match sits under (default: true)
    #[serde(default)]
    pub smart_context: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchLinksRequest {
    /// Link kinds: "all", "wiki_links", "markdown_links", or "external_urls" (default: all)
    #[serde(default)]
    pub link_type: Option<String>,
    /// Regex the link URL must match (case-insensitive)
    #[serde(default)]
    pub url_pattern: Option<String>,
    /// Regex the link title must match (case-insensitive)
    #[serde(default)]
    pub title_pattern: Option<String>,
    /// Whether the search is case sensitive (default: configured default)
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Folder, relative to the vault root, to limit the search to
    #[serde(default)]
    pub folder: Option<String>,
    /// Maximum number of results, capped to 1..=100 (default: configured limit)
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchBacklinksRequest {
    /// Note to find backlinks for, relative to the vault root (e.g. "Projects/Alpha.md")
    pub target_note: String,
    /// Whether the search is case sensitive (default: configured default)
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Folder, relative to the vault root, to limit the search to
    #[serde(default)]
    pub folder: Option<String>,
    /// Maximum number of results, capped to 1..=100 (default: configured limit)
    #[serde(default)]
    pub max_results: Option<i64>,
    /// Include the frontmatter property or heading each link sits under (default: true)
    #[serde(default)]
    pub smart_context: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchRecentNotesRequest {
    /// Start date, inclusive, in YYYY-MM-DD format (e.g. "2024-01-15")
    #[serde(default)]
    pub start_date: Option<String>,
    /// End date, inclusive, in YYYY-MM-DD format (e.g. "2024-01-31")
    #[serde(default)]
    pub end_date: Option<String>,
    /// Folder, relative to the vault root, to limit the search to
    #[serde(default)]
    pub folder: Option<String>,
    /// Maximum number of results, capped to 1..=100 (default: configured limit)
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct SearchOrphanedNotesRequest {
    /// Whether link matching is case sensitive (default: configured default)
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Folder, relative to the vault root, to limit the search to
    #[serde(default)]
    pub folder: Option<String>,
    /// Maximum number of results, capped to 1..=100 (default: configured limit)
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub struct GetFrontmatterRequest {
    /// Note path relative to the vault root
    pub file: String,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct NoteHit {
    pub file: String,
    pub line_number: usize,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchNotesReport {
    pub query: String,
    pub search_scope: String,
    pub total_matches: usize,
    pub results: Vec<NoteHit>,
}

#[derive(Debug, Serialize)]
pub struct LinkFilters {
    pub url_pattern: Option<String>,
    pub title_pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchLinksReport {
    pub link_type: String,
    pub filters: LinkFilters,
    pub total_matches: usize,
    pub results: Vec<LinkMatch>,
}

#[derive(Debug, Serialize)]
pub struct Backlink {
    pub file: String,
    pub line_number: usize,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BacklinksReport {
    pub target_note: String,
    pub total_backlinks: usize,
    pub backlinks: Vec<Backlink>,
}

#[derive(Debug, Serialize)]
pub struct DateRangeEcho {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecentNotesReport {
    pub date_range: DateRangeEcho,
    pub total_files: usize,
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Serialize)]
pub struct OrphanNote {
    pub file: String,
    pub modified_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct OrphansReport {
    pub total_orphaned: usize,
    pub orphaned_notes: Vec<OrphanNote>,
}

#[derive(Debug, Serialize)]
pub struct FrontmatterReport {
    pub file: String,
    pub frontmatter: Option<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn search_notes(
    engine: &SearchEngine,
    defaults: &Defaults,
    request: &SearchNotesRequest,
) -> Result<SearchNotesReport, InputError> {
    let scope = match non_empty(&request.search_scope) {
        Some(s) => s.parse::<SearchScope>().map_err(InputError::SearchScope)?,
        None => SearchScope::All,
    };
    let folder = non_empty(&request.folder);
    check_folder(engine, folder)?;

    let options = SearchOptions {
        case_sensitive: defaults.case_sensitive(request.case_sensitive),
        folder,
        max_results: defaults.max_results(request.max_results),
        scope,
        smart_context: request.smart_context.unwrap_or(true),
    };

    let results: Vec<NoteHit> = engine
        .search(&request.query, &options)
        .into_iter()
        .map(|m| NoteHit {
            snippet: m.record.text.trim().to_string(),
            file: m.record.file,
            line_number: m.record.line_number,
            smart_context: m.smart_context,
        })
        .collect();

    Ok(SearchNotesReport {
        query: request.query.clone(),
        search_scope: scope.to_string(),
        total_matches: results.len(),
        results,
    })
}

pub fn search_links(
    engine: &SearchEngine,
    defaults: &Defaults,
    request: &SearchLinksRequest,
) -> Result<SearchLinksReport, InputError> {
    let link_type = match non_empty(&request.link_type) {
        Some(s) => s.parse::<LinkType>().map_err(InputError::LinkType)?,
        None => LinkType::All,
    };
    let url_pattern = non_empty(&request.url_pattern);
    let title_pattern = non_empty(&request.title_pattern);

    // compile each filter on its own so the error names the right field
    LinkFilter::new(url_pattern, None).map_err(|e| InputError::Pattern {
        field: "url_pattern",
        message: e.to_string(),
    })?;
    let filter = LinkFilter::new(url_pattern, title_pattern).map_err(|e| InputError::Pattern {
        field: "title_pattern",
        message: e.to_string(),
    })?;

    let folder = non_empty(&request.folder);
    check_folder(engine, folder)?;

    let results = engine.find_links(
        link_type,
        &filter,
        defaults.case_sensitive(request.case_sensitive),
        folder,
        defaults.max_results(request.max_results),
    );

    Ok(SearchLinksReport {
        link_type: link_type.to_string(),
        filters: LinkFilters {
            url_pattern: request.url_pattern.clone(),
            title_pattern: request.title_pattern.clone(),
        },
        total_matches: results.len(),
        results,
    })
}

pub fn search_backlinks(
    engine: &SearchEngine,
    defaults: &Defaults,
    request: &SearchBacklinksRequest,
) -> Result<BacklinksReport, InputError> {
    let folder = non_empty(&request.folder);
    check_folder(engine, folder)?;

    let backlinks: Vec<Backlink> = engine
        .backlinks(
            &request.target_note,
            defaults.case_sensitive(request.case_sensitive),
            folder,
            defaults.max_results(request.max_results),
            request.smart_context.unwrap_or(true),
        )
        .into_iter()
        .map(|m| Backlink {
            context: m.record.text.trim().to_string(),
            file: m.record.file,
            line_number: m.record.line_number,
            smart_context: m.smart_context,
        })
        .collect();

    Ok(BacklinksReport {
        target_note: request.target_note.clone(),
        total_backlinks: backlinks.len(),
        backlinks,
    })
}

pub fn search_recent_notes(
    engine: &SearchEngine,
    defaults: &Defaults,
    request: &SearchRecentNotesRequest,
) -> Result<RecentNotesReport, InputError> {
    let start = match request.start_date.as_deref() {
        Some(s) => Some(parse_date(s).ok_or_else(|| InputError::StartDate(s.to_string()))?),
        None => None,
    };
    let end = match request.end_date.as_deref() {
        Some(s) => Some(parse_date(s).ok_or_else(|| InputError::EndDate(s.to_string()))?),
        None => None,
    };

    let mut files = engine
        .recent_notes(&DateRange { start, end }, non_empty(&request.folder))
        .map_err(InputError::Folder)?;
    files.truncate(defaults.max_results(request.max_results));

    Ok(RecentNotesReport {
        date_range: DateRangeEcho {
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
        },
        total_files: files.len(),
        files,
    })
}

pub fn search_orphaned_notes(
    engine: &SearchEngine,
    defaults: &Defaults,
    request: &SearchOrphanedNotesRequest,
) -> Result<OrphansReport, InputError> {
    let orphaned_notes: Vec<OrphanNote> = engine
        .orphans(
            defaults.case_sensitive(request.case_sensitive),
            non_empty(&request.folder),
            defaults.max_results(request.max_results),
        )
        .map_err(InputError::Folder)?
        .into_iter()
        .map(|f| OrphanNote {
            file: f.file,
            modified_date: f.modified_date,
        })
        .collect();

    Ok(OrphansReport {
        total_orphaned: orphaned_notes.len(),
        orphaned_notes,
    })
}

pub fn get_frontmatter(engine: &SearchEngine, request: &GetFrontmatterRequest) -> Result<FrontmatterReport, InputError> {
    let frontmatter = engine.frontmatter(&request.file).map_err(InputError::File)?;
    Ok(FrontmatterReport {
        file: request.file.clone(),
        frontmatter,
    })
}

/// Pretty JSON for a report, or `{"error": ...}` for rejected input.
pub fn render<T: Serialize>(result: Result<T, InputError>) -> String {
    let value = match result {
        Ok(report) => serde_json::to_value(report).unwrap_or_else(|e| error_value(&e.to_string())),
        Err(e) => error_value(&e.to_string()),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn error_value(message: &str) -> Value {
    serde_json::json!({ "error": message })
}
