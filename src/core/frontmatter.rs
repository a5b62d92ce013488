use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Number, Value as JsonValue};
use serde_yaml::Value as YamlValue;

const DELIMITER: &str = "---";

lazy_static! {
    // YAML 1.1 timestamp shapes: date, or date + time with optional offset
    static ref TIMESTAMP_RE: Regex = Regex::new(
        r"^\d{4}-\d{1,2}-\d{1,2}([Tt ]+\d{1,2}:\d{2}:\d{2}(\.\d+)?\s*(Z|[+-]\d{1,2}(:?\d{2})?)?)?$"
    )
    .unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#""([^"\n]*)"|'([^'\n]*)'"#).unwrap();
}

/// 1-based line number of the closing `---`, if the file opens with a
/// complete frontmatter block.
pub fn frontmatter_end<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    let first = lines.first()?;
    if first.as_ref().trim() != DELIMITER {
        return None;
    }

    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.as_ref().trim() == DELIMITER)
        .map(|(idx, _)| idx + 1)
}

/// Whether `line_number` (1-based) falls inside the leading frontmatter
/// block, delimiters included.
pub fn is_in_frontmatter<S: AsRef<str>>(lines: &[S], line_number: usize) -> bool {
    if line_number < 1 || line_number > lines.len() {
        return false;
    }

    match frontmatter_end(lines) {
        Some(end) => line_number <= end,
        None => false,
    }
}

/// Decodes the leading frontmatter block as a key-value mapping.
///
/// Returns `None` when there is no complete block, the block is empty, the
/// YAML does not decode, or it decodes to something other than a mapping.
pub fn parse_frontmatter(content: &str) -> Option<Map<String, JsonValue>> {
    let lines: Vec<&str> = content.lines().collect();
    let end = frontmatter_end(&lines)?;
    let body = lines[1..end - 1].join("\n");

    if body.trim().is_empty() {
        return None;
    }

    let yaml: YamlValue = match serde_yaml::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("frontmatter is not valid YAML: {}", e);
            return None;
        }
    };

    match convert(yaml, &quoted_timestamps(&body)) {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}

/// Converts decoded YAML into JSON, rendering timestamps as ISO-8601
/// strings all the way down.
pub fn yaml_to_json(value: YamlValue) -> JsonValue {
    convert(value, &HashSet::new())
}

/// Timestamp-shaped strings written quoted in the source. Quoting makes
/// them plain strings, so they are left as written. A value that appears
/// both quoted and plain is treated as quoted.
fn quoted_timestamps(yaml: &str) -> HashSet<String> {
    QUOTED_RE
        .captures_iter(yaml)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str())
        .filter(|s| TIMESTAMP_RE.is_match(s.trim()))
        .map(str::to_string)
        .collect()
}

fn convert(value: YamlValue, quoted: &HashSet<String>) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(n.to_string()))
            }
        }
        YamlValue::String(s) if quoted.contains(&s) => JsonValue::String(s),
        YamlValue::String(s) => JsonValue::String(normalize_timestamp(&s).unwrap_or(s)),
        YamlValue::Sequence(items) => {
            JsonValue::Array(items.into_iter().map(|v| convert(v, quoted)).collect())
        }
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(mapping_key(key), convert(value, quoted));
            }
            JsonValue::Object(map)
        }
        YamlValue::Tagged(tagged) => convert(tagged.value, quoted),
    }
}

fn mapping_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Null => "null".to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Rewrites a YAML timestamp scalar into ISO-8601. Plain dates are already
/// ISO-8601 and only have their padding fixed.
fn normalize_timestamp(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if !TIMESTAMP_RE.is_match(trimmed) {
        return None;
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.to_rfc3339());
    }

    let spaced = trimmed.replacen(['T', 't'], " ", 1);
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&spaced, fmt) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&spaced, fmt) {
            return Some(dt.to_rfc3339());
        }
    }

    None
}
