//! Search Engine - runs the external tool and layers vault semantics on top
//!
//! Every call re-scans the vault; nothing is cached between calls.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::ripgrep::{SearchBackend, SearchRequest};
use crate::core::context::smart_context;
use crate::core::frontmatter::is_in_frontmatter;
use crate::core::links::{extract_links, link_matches, LinkFilter, LinkMatch, LinkType};
use crate::core::note::{filter_by_date, list_files, read_frontmatter, DateRange, FileInfo};
use crate::core::paths::{PathError, VaultPaths};
use crate::core::record::{EnrichedMatch, MatchRecord};

/// Per-file cap used when scanning for outgoing links during orphan
/// detection.
const ORPHAN_LINK_SCAN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    All,
    ContentOnly,
    FrontmatterOnly,
}

impl SearchScope {
    pub const NAMES: [&'static str; 3] = ["all", "content_only", "frontmatter_only"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ContentOnly => "content_only",
            Self::FrontmatterOnly => "frontmatter_only",
        }
    }

    fn keeps(self, in_frontmatter: bool) -> bool {
        match self {
            Self::All => true,
            Self::ContentOnly => !in_frontmatter,
            Self::FrontmatterOnly => in_frontmatter,
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "content_only" => Ok(Self::ContentOnly),
            "frontmatter_only" => Ok(Self::FrontmatterOnly),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions<'a> {
    pub case_sensitive: bool,
    pub folder: Option<&'a str>,
    pub max_results: usize,
    pub scope: SearchScope,
    pub smart_context: bool,
}

impl Default for SearchOptions<'_> {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            folder: None,
            max_results: 15,
            scope: SearchScope::All,
            smart_context: true,
        }
    }
}

/// The tool's cap applies per file, so ask for more than the global limit.
pub fn per_file_cap(max_results: usize) -> usize {
    (max_results.saturating_mul(2)).clamp(1, 50)
}

/// Regex matching wiki-links or Markdown links that point at `target`.
///
/// The wiki-link variant matches on the note name (no folder, no `.md`);
/// the Markdown variant on the path as given.
pub fn backlink_pattern(target: &str) -> String {
    let without_ext = target.strip_suffix(".md").unwrap_or(target);
    let name = without_ext.rsplit('/').next().unwrap_or(without_ext);
    format!(
        r"(\[\[.*{}.*\]\])|(\[.*\]\(.*{}.*\))",
        regex::escape(name),
        regex::escape(target)
    )
}

/// Lines of each file read during one call.
struct FileCache<'a> {
    paths: &'a VaultPaths,
    files: HashMap<String, Option<Vec<String>>>,
}

impl<'a> FileCache<'a> {
    fn new(paths: &'a VaultPaths) -> Self {
        Self {
            paths,
            files: HashMap::new(),
        }
    }

    fn lines(&mut self, file: &str) -> Option<&[String]> {
        let paths = self.paths;
        self.files
            .entry(file.to_string())
            .or_insert_with(|| {
                let full = paths.resolve(file).ok()?;
                match fs::read_to_string(&full) {
                    Ok(content) => Some(content.lines().map(str::to_string).collect()),
                    Err(e) => {
                        tracing::debug!("cannot read {}: {}", full.display(), e);
                        None
                    }
                }
            })
            .as_deref()
    }
}

pub struct SearchEngine {
    paths: VaultPaths,
    backend: Box<dyn SearchBackend>,
    pcre2: bool,
}

impl SearchEngine {
    pub fn new(paths: VaultPaths, backend: Box<dyn SearchBackend>) -> Self {
        Self {
            paths,
            backend,
            pcre2: false,
        }
    }

    /// Use the tool's extended regex engine for scope-filtered searches.
    pub fn with_pcre2(mut self, enabled: bool) -> Self {
        self.pcre2 = enabled;
        self
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    fn run(&self, request: &SearchRequest<'_>) -> Vec<MatchRecord> {
        match self.backend.search(request) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("search for {:?} failed: {}", request.pattern, e);
                Vec::new()
            }
        }
    }

    /// Regex search with optional frontmatter/body filtering and smart
    /// context. Keeps the tool's order.
    pub fn search(&self, query: &str, options: &SearchOptions<'_>) -> Vec<EnrichedMatch> {
        let mut max_count = per_file_cap(options.max_results);
        if options.scope != SearchScope::All {
            max_count *= 3;
        }
        self.collect(query, options, max_count, None)
    }

    /// Runs the tool and keeps up to `options.max_results` matches, counting
    /// only matches outside `skip_file`.
    fn collect(
        &self,
        query: &str,
        options: &SearchOptions<'_>,
        max_count: usize,
        skip_file: Option<&str>,
    ) -> Vec<EnrichedMatch> {
        let filtered = options.scope != SearchScope::All;
        let records = self.run(&SearchRequest {
            pattern: query,
            case_sensitive: options.case_sensitive,
            folder: options.folder,
            max_count,
            pcre2: filtered && self.pcre2,
        });
        tracing::debug!("{} raw matches for {:?}", records.len(), query);

        let needs_file = filtered || options.smart_context;
        let mut cache = FileCache::new(&self.paths);
        let mut results = Vec::new();

        for record in records {
            if results.len() >= options.max_results {
                break;
            }
            if skip_file == Some(record.file.as_str()) {
                continue;
            }
            if !needs_file {
                results.push(EnrichedMatch::from(record));
                continue;
            }

            let Some(lines) = cache.lines(&record.file) else {
                // unreadable: unfilterable, but an unscoped hit is still a hit
                if !filtered {
                    results.push(EnrichedMatch::from(record));
                }
                continue;
            };
            if record.line_number > lines.len() {
                continue;
            }
            if !options.scope.keeps(is_in_frontmatter(lines, record.line_number)) {
                continue;
            }

            let context = if options.smart_context {
                smart_context(lines, record.line_number)
            } else {
                None
            };
            results.push(EnrichedMatch {
                record,
                smart_context: context,
            });
        }

        results
    }

    fn link_records(
        &self,
        link_type: LinkType,
        case_sensitive: bool,
        folder: Option<&str>,
        max_count: usize,
    ) -> Vec<MatchRecord> {
        let pattern = link_type.search_pattern();
        self.run(&SearchRequest {
            pattern: &pattern,
            case_sensitive,
            folder,
            max_count,
            pcre2: false,
        })
    }

    pub fn find_links(
        &self,
        link_type: LinkType,
        filter: &LinkFilter,
        case_sensitive: bool,
        folder: Option<&str>,
        max_results: usize,
    ) -> Vec<LinkMatch> {
        let records = self.link_records(link_type, case_sensitive, folder, per_file_cap(max_results));

        let mut links: Vec<LinkMatch> = records
            .iter()
            .flat_map(|r| link_matches(r, link_type, filter))
            .collect();
        tracing::debug!("{} links from {} lines", links.len(), records.len());
        links.truncate(max_results);
        links
    }

    /// Lines in other notes that link to `target_note`.
    pub fn backlinks(
        &self,
        target_note: &str,
        case_sensitive: bool,
        folder: Option<&str>,
        max_results: usize,
        smart_context: bool,
    ) -> Vec<EnrichedMatch> {
        let pattern = backlink_pattern(target_note);
        let options = SearchOptions {
            case_sensitive,
            folder,
            max_results,
            scope: SearchScope::All,
            smart_context,
        };

        // the note's own links never count toward the limit
        let max_count = per_file_cap(max_results.saturating_mul(2));
        self.collect(&pattern, &options, max_count, Some(target_note))
    }

    fn has_backlinks(&self, note: &str, case_sensitive: bool) -> bool {
        let pattern = backlink_pattern(note);
        // one hit per file is enough to know whether anyone else links here
        self.run(&SearchRequest {
            pattern: &pattern,
            case_sensitive,
            folder: None,
            max_count: 1,
            pcre2: false,
        })
        .iter()
        .any(|r| r.file != note)
    }

    /// Notes under `folder` modified inside `range`, newest first.
    pub fn recent_notes(&self, range: &DateRange, folder: Option<&str>) -> Result<Vec<FileInfo>, PathError> {
        Ok(filter_by_date(list_files(&self.paths, folder)?, range))
    }

    /// Notes with neither outgoing links nor links from other notes.
    ///
    /// One tool run per candidate for incoming links, so cost grows with
    /// vault size.
    pub fn orphans(
        &self,
        case_sensitive: bool,
        folder: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<FileInfo>, PathError> {
        let files = self.recent_notes(&DateRange::default(), folder)?;

        let with_outgoing: HashSet<String> = self
            .link_records(LinkType::All, case_sensitive, folder, ORPHAN_LINK_SCAN)
            .into_iter()
            .filter(|r| !extract_links(&r.text, LinkType::All).is_empty())
            .map(|r| r.file)
            .collect();

        let mut orphans = Vec::new();
        for info in files {
            if with_outgoing.contains(&info.file) || self.has_backlinks(&info.file, case_sensitive) {
                continue;
            }
            orphans.push(info);
            if orphans.len() >= max_results {
                break;
            }
        }

        Ok(orphans)
    }

    pub fn frontmatter(&self, file: &str) -> Result<Option<Map<String, Value>>, PathError> {
        read_frontmatter(&self.paths, file)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::links::LinkKind;
    use crate::search::ripgrep::SearchError;
    use regex::RegexBuilder;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};
    use walkdir::WalkDir;

    /// In-process stand-in for ripgrep over a temp vault: same event order
    /// (files newest first, lines in order) and per-file cap.
    pub(crate) struct FakeBackend {
        paths: VaultPaths,
        pub requests: Mutex<Vec<(String, usize, bool)>>,
    }

    impl FakeBackend {
        pub(crate) fn new(root: &Path) -> Self {
            Self {
                paths: VaultPaths::from_root(root.to_path_buf()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl SearchBackend for FakeBackend {
        fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<MatchRecord>, SearchError> {
            self.requests.lock().unwrap().push((
                request.pattern.to_string(),
                request.max_count,
                request.case_sensitive,
            ));
            let re = match RegexBuilder::new(request.pattern)
                .case_insensitive(!request.case_sensitive)
                .build()
            {
                Ok(re) => re,
                Err(_) => {
                    return Err(SearchError::ToolFailed {
                        code: Some(2),
                        stderr: "regex parse error".to_string(),
                    })
                }
            };

            let root = self.paths.search_root(request.folder)?;
            let mut files: Vec<_> = WalkDir::new(&root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().map_or(false, |x| x == "md"))
                .filter(|e| !e.path().components().any(|c| c.as_os_str() == ".obsidian"))
                .map(|e| {
                    let mtime = e.metadata().unwrap().modified().unwrap();
                    (mtime, e.path().to_path_buf())
                })
                .collect();
            files.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let mut out = Vec::new();
            for (_, path) in files {
                let content = fs::read_to_string(&path).unwrap();
                let mut count = 0;
                for (idx, line) in content.lines().enumerate() {
                    if count >= request.max_count {
                        break;
                    }
                    if let Some(m) = re.find(line) {
                        count += 1;
                        out.push(MatchRecord {
                            file: self.paths.relative_path(&path.to_string_lossy()),
                            line_number: idx + 1,
                            text: line.to_string(),
                            match_start: m.start(),
                            match_end: m.end(),
                        });
                    }
                }
            }
            Ok(out)
        }
    }

    impl SearchBackend for Arc<FakeBackend> {
        fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<MatchRecord>, SearchError> {
            self.as_ref().search(request)
        }
    }

    struct FailingBackend;

    impl SearchBackend for FailingBackend {
        fn search(&self, _: &SearchRequest<'_>) -> Result<Vec<MatchRecord>, SearchError> {
            Err(SearchError::ToolFailed {
                code: Some(2),
                stderr: "boom".to_string(),
            })
        }
    }

    const PROJECT: &str = "---
name: SuperProject
mentioned_projects:
  - ProjectAlpha
assigned_to: Charlie
---
# Introduction
SuperProject starts here.
## Team Members
- Alice
- Charlie
## Project Overview
ProjectAlpha is first.
";

    pub(crate) fn vault(files: &[(&str, &str)]) -> (tempfile::TempDir, SearchEngine) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let engine = SearchEngine::new(
            VaultPaths::from_root(dir.path().to_path_buf()),
            Box::new(FakeBackend::new(dir.path())),
        );
        (dir, engine)
    }

    fn contexts(results: &[EnrichedMatch]) -> Vec<(usize, Option<&str>)> {
        results
            .iter()
            .map(|m| (m.record.line_number, m.smart_context.as_deref()))
            .collect()
    }

    #[test]
    fn test_scope_all_attaches_both_kinds_of_context() {
        let (_dir, engine) = vault(&[("project.md", PROJECT)]);
        let results = engine.search("ProjectAlpha", &SearchOptions::default());
        assert_eq!(
            contexts(&results),
            vec![(4, Some("mentioned_projects")), (13, Some("Project Overview"))]
        );

        let results = engine.search("charlie", &SearchOptions::default());
        assert_eq!(
            contexts(&results),
            vec![(5, Some("assigned_to")), (11, Some("Team Members"))]
        );
    }

    #[test]
    fn test_scope_filters() {
        let (_dir, engine) = vault(&[("project.md", PROJECT)]);

        let fm = engine.search(
            "SuperProject",
            &SearchOptions {
                scope: SearchScope::FrontmatterOnly,
                ..Default::default()
            },
        );
        assert_eq!(contexts(&fm), vec![(2, Some("name"))]);

        let body = engine.search(
            "SuperProject",
            &SearchOptions {
                scope: SearchScope::ContentOnly,
                ..Default::default()
            },
        );
        assert_eq!(contexts(&body), vec![(8, Some("Introduction"))]);
    }

    #[test]
    fn test_filtered_scope_requests_three_times_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "x\n").unwrap();
        let backend = Arc::new(FakeBackend::new(dir.path()));
        let engine = SearchEngine::new(
            VaultPaths::from_root(dir.path().to_path_buf()),
            Box::new(Arc::clone(&backend)),
        );

        engine.search("x", &SearchOptions { max_results: 5, ..Default::default() });
        engine.search(
            "x",
            &SearchOptions {
                max_results: 5,
                scope: SearchScope::ContentOnly,
                ..Default::default()
            },
        );
        engine.search("x", &SearchOptions { max_results: 40, ..Default::default() });
        engine.search(
            "x",
            &SearchOptions {
                case_sensitive: true,
                max_results: 40,
                scope: SearchScope::FrontmatterOnly,
                ..Default::default()
            },
        );

        let caps: Vec<_> = backend
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cap, case)| (*cap, *case))
            .collect();
        assert_eq!(caps, vec![(10, false), (30, false), (50, false), (150, true)]);
        assert_eq!(per_file_cap(0), 1);
    }

    #[test]
    fn test_smart_context_disabled_and_truncation() {
        let body: String = (1..=30).map(|i| format!("meeting {}\n", i)).collect();
        let (_dir, engine) = vault(&[("log.md", &body)]);

        let results = engine.search(
            "meeting",
            &SearchOptions {
                max_results: 3,
                smart_context: false,
                ..Default::default()
            },
        );
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|m| m.smart_context.is_none()));
        assert_eq!(results[2].record.text, "meeting 3");
    }

    #[test]
    fn test_filtered_truncation_after_filtering() {
        let mut note = String::from("---\n");
        for i in 0..10 {
            note.push_str(&format!("k{}: target\n", i));
        }
        note.push_str("---\n");
        for _ in 0..10 {
            note.push_str("target in body\n");
        }
        let (_dir, engine) = vault(&[("n.md", &note)]);

        let body = engine.search(
            "target",
            &SearchOptions {
                max_results: 4,
                scope: SearchScope::ContentOnly,
                ..Default::default()
            },
        );
        assert_eq!(body.len(), 4);
        assert!(body.iter().all(|m| m.record.line_number > 12));
    }

    #[test]
    fn test_backend_failure_is_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SearchEngine::new(VaultPaths::from_root(dir.path().to_path_buf()), Box::new(FailingBackend));
        assert!(engine.search("x", &SearchOptions::default()).is_empty());
        assert!(engine
            .find_links(LinkType::All, &LinkFilter::default(), false, None, 10)
            .is_empty());
    }

    #[test]
    fn test_find_links() {
        let (_dir, engine) = vault(&[(
            "a.md",
            "See [[Note A]] and [title](url.md) and https://x.com\nplain line\n",
        )]);

        let links = engine.find_links(LinkType::All, &LinkFilter::default(), false, None, 15);
        let kinds: Vec<_> = links.iter().map(|l| l.link_type).collect();
        assert_eq!(kinds, vec![LinkKind::WikiLink, LinkKind::MarkdownLink, LinkKind::ExternalUrl]);
        assert!(links.iter().all(|l| l.file == "a.md" && l.line_number == 1));

        let filter = LinkFilter::new(Some("x\\.com"), None).unwrap();
        let links = engine.find_links(LinkType::All, &filter, false, None, 15);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://x.com");

        let links = engine.find_links(LinkType::All, &LinkFilter::default(), false, None, 2);
        assert_eq!(links.len(), 2);
    }

    #[test]
    fn test_backlinks_exclude_self() {
        let (_dir, engine) = vault(&[
            ("target.md", "I link to myself: [[target]]\n"),
            ("Notes/other.md", "## Refs\nsee [[target]]\n"),
            ("third.md", "[doc](target.md)\n"),
            ("unrelated.md", "nothing\n"),
        ]);

        let backlinks = engine.backlinks("target.md", false, None, 10, true);
        let mut files: Vec<_> = backlinks.iter().map(|m| m.record.file.as_str()).collect();
        files.sort();
        assert_eq!(files, vec!["Notes/other.md", "third.md"]);

        let other = backlinks.iter().find(|m| m.record.file == "Notes/other.md").unwrap();
        assert_eq!(other.smart_context.as_deref(), Some("Refs"));

        assert_eq!(engine.backlinks("target.md", false, None, 1, false).len(), 1);
    }

    #[test]
    fn test_backlink_limit_counts_only_other_notes() {
        let (dir, engine) = vault(&[
            ("a_other.md", "see [[target]]\n"),
            ("target.md", "[[target]]\n[[target]] again\n[[target]] and more\n"),
        ]);
        // the target is newest, so its own links come first in the tool's order
        let older = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(dir.path().join("a_other.md"))
            .unwrap()
            .set_modified(older)
            .unwrap();

        let backlinks = engine.backlinks("target.md", false, None, 1, false);
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].record.file, "a_other.md");
        assert_eq!(backlinks[0].record.line_number, 1);
    }

    #[test]
    fn test_backlink_pattern_uses_note_name() {
        let re = regex::Regex::new(&backlink_pattern("Projects/Alpha Plan.md")).unwrap();
        assert!(re.is_match("see [[Alpha Plan]]"));
        assert!(re.is_match("see [[Alpha Plan|the plan]]"));
        assert!(re.is_match("[plan](Projects/Alpha Plan.md)"));
        assert!(!re.is_match("[plan](Alpha Plan.md)"));
        assert!(!re.is_match("Alpha Plan"));
    }

    #[test]
    fn test_orphans() {
        let (_dir, engine) = vault(&[
            ("hub.md", "links to [[leaf]]\n"),
            ("leaf.md", "no links here\n"),
            ("lonely.md", "---\ntitle: lonely\n---\nnobody links here\n"),
            ("web.md", "only https://example.com\n"),
            ("selfish.md", "only [[selfish]]\n"),
        ]);

        let mut orphans: Vec<_> = engine
            .orphans(false, None, 10)
            .unwrap()
            .into_iter()
            .map(|f| f.file)
            .collect();
        orphans.sort();
        assert_eq!(orphans, vec!["lonely.md"]);

        assert_eq!(engine.orphans(false, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_orphan_cap_stops_early() {
        let (_dir, engine) = vault(&[("a.md", "x\n"), ("b.md", "y\n"), ("c.md", "z\n")]);
        assert_eq!(engine.orphans(false, None, 2).unwrap().len(), 2);
        assert_eq!(engine.orphans(false, None, 100).unwrap().len(), 3);
    }

    #[test]
    fn test_scope_names() {
        for name in SearchScope::NAMES {
            assert_eq!(name.parse::<SearchScope>().unwrap().as_str(), name);
        }
        assert_eq!("body".parse::<SearchScope>(), Err("body".to_string()));
    }
}
