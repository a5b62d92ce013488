//! ripgrep `--json` event stream.
//!
//! Each output line is one object tagged by `type`; only `match` events
//! carry results. Lines that fail to decode are skipped.

use serde::Deserialize;
use serde_json::Value;

use crate::core::record::MatchRecord;

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct MatchData {
    path: Data,
    lines: Data,
    line_number: Option<usize>,
    #[serde(default)]
    submatches: Vec<Submatch>,
}

/// Either `{"text": ...}` or `{"bytes": ...}` for non-UTF-8 content.
#[derive(Debug, Deserialize)]
struct Data {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Submatch {
    start: usize,
    end: usize,
}

fn parse_line(line: &str, relativize: &impl Fn(&str) -> String) -> Result<Option<MatchRecord>, serde_json::Error> {
    let event: Event = serde_json::from_str(line)?;
    if event.kind != "match" {
        return Ok(None);
    }

    let data: MatchData = serde_json::from_value(event.data)?;
    let Some(path) = data.path.text else {
        return Ok(None);
    };
    let line_number = match data.line_number {
        Some(n) if n >= 1 => n,
        _ => return Ok(None),
    };

    let text = data.lines.text.unwrap_or_default();
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let text = text.strip_suffix('\r').unwrap_or(text).to_string();

    let (match_start, match_end) = data
        .submatches
        .first()
        .map(|s| (s.start, s.end))
        .unwrap_or((0, 0));

    Ok(Some(MatchRecord {
        file: relativize(&path),
        line_number,
        text,
        match_start,
        match_end,
    }))
}

/// Collects the `match` events of a whole run, in emission order.
pub fn parse_matches(output: &str, relativize: impl Fn(&str) -> String) -> Vec<MatchRecord> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match parse_line(line, &relativize) {
            Ok(record) => record,
            Err(e) => {
                tracing::trace!("skipping malformed event: {}", e);
                None
            }
        })
        .collect()
}
