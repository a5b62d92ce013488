use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use super::record::MatchRecord;

pub const WIKILINK_PATTERN: &str = r"\[\[([^\]]+)\]\]";
pub const MARKDOWN_LINK_PATTERN: &str = r"\[([^\]]*)\]\(([^)]+)\)";
pub const EXTERNAL_URL_PATTERN: &str = r#"https?://[^\s\)"']+"#;

lazy_static! {
    // [[target]], [[target|alias]] keeps the alias in the capture
    static ref WIKILINK_RE: Regex = Regex::new(WIKILINK_PATTERN).unwrap();
    // [title](target)
    static ref MARKDOWN_LINK_RE: Regex = Regex::new(MARKDOWN_LINK_PATTERN).unwrap();
    static ref EXTERNAL_URL_RE: Regex = Regex::new(EXTERNAL_URL_PATTERN).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    WikiLink,
    MarkdownLink,
    ExternalUrl,
}

impl LinkKind {
    pub fn pattern(self) -> &'static str {
        match self {
            Self::WikiLink => WIKILINK_PATTERN,
            Self::MarkdownLink => MARKDOWN_LINK_PATTERN,
            Self::ExternalUrl => EXTERNAL_URL_PATTERN,
        }
    }
}

/// Which link syntaxes a link search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkType {
    #[default]
    All,
    WikiLinks,
    MarkdownLinks,
    ExternalUrls,
}

impl LinkType {
    pub const NAMES: [&'static str; 4] = ["all", "wiki_links", "markdown_links", "external_urls"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::WikiLinks => "wiki_links",
            Self::MarkdownLinks => "markdown_links",
            Self::ExternalUrls => "external_urls",
        }
    }

    pub fn kinds(self) -> &'static [LinkKind] {
        match self {
            Self::All => &[LinkKind::WikiLink, LinkKind::MarkdownLink, LinkKind::ExternalUrl],
            Self::WikiLinks => &[LinkKind::WikiLink],
            Self::MarkdownLinks => &[LinkKind::MarkdownLink],
            Self::ExternalUrls => &[LinkKind::ExternalUrl],
        }
    }

    pub fn includes(self, kind: LinkKind) -> bool {
        self.kinds().contains(&kind)
    }

    /// Alternation of the selected syntaxes, for the search tool.
    pub fn search_pattern(self) -> String {
        self.kinds()
            .iter()
            .map(|k| format!("({})", k.pattern()))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "wiki_links" => Ok(Self::WikiLinks),
            "markdown_links" => Ok(Self::MarkdownLinks),
            "external_urls" => Ok(Self::ExternalUrls),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkMatch {
    pub file: String,
    pub line_number: usize,
    pub link_type: LinkKind,
    pub title: String,
    pub url: String,
    pub context: String,
}

/// Optional case-insensitive constraints on a link's URL and title.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    url: Option<Regex>,
    title: Option<Regex>,
}

impl LinkFilter {
    pub fn new(url_pattern: Option<&str>, title_pattern: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            url: url_pattern.map(compile_insensitive).transpose()?,
            title: title_pattern.map(compile_insensitive).transpose()?,
        })
    }

    pub fn matches(&self, url: &str, title: &str) -> bool {
        self.url.as_ref().map_or(true, |re| re.is_match(url))
            && self.title.as_ref().map_or(true, |re| re.is_match(title))
    }
}

fn compile_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Every link of the selected kinds in `text` as `(kind, title, url)`:
/// wiki-links first, then Markdown links, then bare URLs, each in order of
/// appearance.
pub fn extract_links(text: &str, link_type: LinkType) -> Vec<(LinkKind, String, String)> {
    let mut links = Vec::new();

    if link_type.includes(LinkKind::WikiLink) {
        for caps in WIKILINK_RE.captures_iter(text) {
            let target = caps[1].to_string();
            links.push((LinkKind::WikiLink, target.clone(), target));
        }
    }

    if link_type.includes(LinkKind::MarkdownLink) {
        for caps in MARKDOWN_LINK_RE.captures_iter(text) {
            links.push((LinkKind::MarkdownLink, caps[1].to_string(), caps[2].to_string()));
        }
    }

    if link_type.includes(LinkKind::ExternalUrl) {
        for m in EXTERNAL_URL_RE.find_iter(text) {
            let url = m.as_str().to_string();
            links.push((LinkKind::ExternalUrl, url.clone(), url));
        }
    }

    links
}

/// Expands one search hit into the links it contains that pass `filter`.
pub fn link_matches(record: &MatchRecord, link_type: LinkType, filter: &LinkFilter) -> Vec<LinkMatch> {
    let context = record.text.trim().to_string();

    extract_links(&record.text, link_type)
        .into_iter()
        .filter(|(_, title, url)| filter.matches(url, title))
        .map(|(kind, title, url)| LinkMatch {
            file: record.file.clone(),
            line_number: record.line_number,
            link_type: kind,
            title,
            url,
            context: context.clone(),
        })
        .collect()
}
