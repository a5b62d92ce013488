use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use walkdir::{DirEntry, WalkDir};

use super::frontmatter::parse_frontmatter;
use super::paths::{PathError, VaultPaths};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub file: String,
    pub modified_date: NaiveDate,
    pub modified_time: DateTime<Local>,
}

impl FileInfo {
    fn load(path: &Path, paths: &VaultPaths) -> std::io::Result<Self> {
        let modified: DateTime<Local> = DateTime::from(fs::metadata(path)?.modified()?);
        let file = path
            .strip_prefix(&paths.root)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| paths.relative_path(&path.to_string_lossy()));

        Ok(Self {
            file,
            modified_date: modified.date_naive(),
            modified_time: modified,
        })
    }
}

/// Inclusive modification-date window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    // chrono accepts unpadded fields; the served format is strictly padded
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Markdown notes under `folder` (or the whole vault), skipping dotfiles
/// and dot-directories. Unreadable entries are skipped.
pub fn list_files(paths: &VaultPaths, folder: Option<&str>) -> Result<Vec<FileInfo>, PathError> {
    let root = paths.search_root(folder)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "md") {
            continue;
        }
        match FileInfo::load(path, paths) {
            Ok(info) => files.push(info),
            Err(e) => tracing::debug!("skipping {}: {}", path.display(), e),
        }
    }

    Ok(files)
}

/// Keeps files inside `range`, newest first.
pub fn filter_by_date(mut files: Vec<FileInfo>, range: &DateRange) -> Vec<FileInfo> {
    files.retain(|f| range.contains(f.modified_date));
    files.sort_by(|a, b| b.modified_time.cmp(&a.modified_time));
    files
}

pub fn read_frontmatter(paths: &VaultPaths, file: &str) -> Result<Option<Map<String, Value>>, PathError> {
    let full = paths.resolve(file)?;
    let content = match fs::read_to_string(&full) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("cannot read {}: {}", full.display(), e);
            return Ok(None);
        }
    };
    Ok(parse_frontmatter(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::SystemTime;

    fn info(file: &str, date: &str) -> FileInfo {
        let day = parse_date(date).unwrap();
        let time = Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .unwrap();
        FileInfo {
            file: file.to_string(),
            modified_date: day,
            modified_time: time,
        }
    }

    fn set_mtime(path: &Path, date: &str) {
        let day = parse_date(date).unwrap();
        let time = Local
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::from(time)).unwrap();
    }

    #[test]
    fn test_parse_date_strict() {
        assert!(parse_date("2024-01-15").is_some());
        assert!(parse_date("2024-02-29").is_some());
        for bad in ["2024-1-15", "24-01-15", "2024/01/15", "2024-13-01", "2024-01-32", "2024-01", "", "invalid-date"] {
            assert!(parse_date(bad).is_none(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_date_range_filter() {
        let files = vec![
            info("a.md", "2024-01-10"),
            info("b.md", "2024-01-20"),
            info("c.md", "2024-02-01"),
        ];
        let range = DateRange {
            start: parse_date("2024-01-15"),
            end: parse_date("2024-01-25"),
        };
        let kept = filter_by_date(files.clone(), &range);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].file, "b.md");

        let open_start = DateRange {
            start: None,
            end: parse_date("2024-01-20"),
        };
        let kept: Vec<_> = filter_by_date(files.clone(), &open_start)
            .into_iter()
            .map(|f| f.file)
            .collect();
        assert_eq!(kept, vec!["b.md", "a.md"]);

        let all: Vec<_> = filter_by_date(files, &DateRange::default())
            .into_iter()
            .map(|f| f.file)
            .collect();
        assert_eq!(all, vec!["c.md", "b.md", "a.md"]);
    }

    #[test]
    fn test_list_files_skips_hidden_and_non_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Daily")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("top.md"), "x").unwrap();
        fs::write(root.join("Daily/2024-01-20.md"), "x").unwrap();
        fs::write(root.join("Daily/.draft.md"), "x").unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "x").unwrap();
        fs::write(root.join("image.png"), "x").unwrap();

        let paths = VaultPaths::from_root(root.to_path_buf());
        let mut names: Vec<_> = list_files(&paths, None)
            .unwrap()
            .into_iter()
            .map(|f| f.file)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Daily/2024-01-20.md", "top.md"]);

        let daily = list_files(&paths, Some("Daily")).unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].file, "Daily/2024-01-20.md");

        assert!(list_files(&paths, Some("../outside")).is_err());
    }

    #[test]
    fn test_recent_files_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (name, date) in [("old.md", "2024-01-10"), ("mid.md", "2024-01-20"), ("new.md", "2024-02-01")] {
            let path = root.join(name);
            fs::write(&path, "x").unwrap();
            set_mtime(&path, date);
        }

        let paths = VaultPaths::from_root(root.to_path_buf());
        let range = DateRange {
            start: parse_date("2024-01-15"),
            end: parse_date("2024-01-25"),
        };
        let files = filter_by_date(list_files(&paths, None).unwrap(), &range);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file, "mid.md");
        assert_eq!(files[0].modified_date, parse_date("2024-01-20").unwrap());
    }

    #[test]
    fn test_read_frontmatter_from_vault() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "---\ntitle: A\n---\nbody\n").unwrap();
        fs::write(dir.path().join("b.md"), "body only\n").unwrap();
        let paths = VaultPaths::from_root(dir.path().to_path_buf());

        let fm = read_frontmatter(&paths, "a.md").unwrap().unwrap();
        assert_eq!(fm["title"], "A");
        assert!(read_frontmatter(&paths, "b.md").unwrap().is_none());
        assert!(read_frontmatter(&paths, "missing.md").unwrap().is_none());
        assert!(read_frontmatter(&paths, "../a.md").is_err());
    }
}
