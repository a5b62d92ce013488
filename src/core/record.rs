use serde::Serialize;

/// One matching line reported by the search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// Vault-relative path.
    pub file: String,
    /// 1-based.
    pub line_number: usize,
    /// The matched line without its line terminator.
    pub text: String,
    pub match_start: usize,
    pub match_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedMatch {
    #[serde(flatten)]
    pub record: MatchRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_context: Option<String>,
}

impl From<MatchRecord> for EnrichedMatch {
    fn from(record: MatchRecord) -> Self {
        Self {
            record,
            smart_context: None,
        }
    }
}
