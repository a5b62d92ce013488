//! Smart context: which frontmatter property or Markdown heading a line
//! belongs to.

use super::frontmatter::{frontmatter_end, is_in_frontmatter};

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn key_before_colon(line: &str) -> Option<&str> {
    let (key, _) = line.split_once(':')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

/// Property key owning a frontmatter line.
///
/// A `key: value` line names itself. Anything else (list items, folded
/// continuation lines, bare `key:` headers) belongs to the nearest earlier
/// line with strictly smaller indentation that contains a colon. Indentation
/// is a raw count of leading whitespace characters; tabs are not expanded.
pub fn property_for_line<S: AsRef<str>>(
    lines: &[S],
    line_number: usize,
    frontmatter_end: usize,
) -> Option<String> {
    if line_number < 1 || line_number > lines.len() || line_number > frontmatter_end {
        return None;
    }

    let target = lines[line_number - 1].as_ref();
    let target_indent = indent_of(target);

    if target.contains(':') && !target.trim().ends_with(':') {
        if let Some(key) = key_before_colon(target) {
            if !key.starts_with('-') {
                return Some(key.to_string());
            }
        }
    }

    // Index 0 is the opening delimiter and never owns anything.
    for idx in (1..line_number - 1).rev() {
        let line = lines[idx].as_ref();
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) < target_indent && line.contains(':') {
            if let Some(key) = key_before_colon(line) {
                return Some(key.to_string());
            }
        }
    }

    None
}

/// Text of the nearest heading at or above `line_number`, with the leading
/// `#` run stripped. Bare `#` lines are skipped.
pub fn heading_for_line<S: AsRef<str>>(lines: &[S], line_number: usize) -> Option<String> {
    if line_number < 1 || line_number > lines.len() {
        return None;
    }

    lines[..line_number].iter().rev().find_map(|line| {
        let trimmed = line.as_ref().trim();
        if !trimmed.starts_with('#') {
            return None;
        }
        let text = trimmed.trim_start_matches('#').trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

/// Dispatches to property resolution for frontmatter lines and heading
/// resolution for body lines.
pub fn smart_context<S: AsRef<str>>(lines: &[S], line_number: usize) -> Option<String> {
    if is_in_frontmatter(lines, line_number) {
        let end = frontmatter_end(lines)?;
        property_for_line(lines, line_number, end)
    } else {
        heading_for_line(lines, line_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT_NOTE: &[&str] = &[
        "---",                           // 1
        "name: SuperProject",            // 2
        "mentioned_projects:",           // 3
        "  - ProjectAlpha",              // 4
        "  - Balaboom",                  // 5
        "team:",                         // 6
        "  team_lead: DevLead",          // 7
        "  developers:",                 // 8
        "    - Developer1",              // 9
        "",                              // 10
        "    - Developer2",              // 11
        "links:",                        // 12
        "  - \"[[Deep Note]]\"",         // 13
        "---",                           // 14
        "# Introduction",                // 15
        "SuperProject kicks off.",       // 16
        "## Team Members",               // 17
        "",                              // 18
        "- Alice",                       // 19
        "- Bob",                         // 20
        "#",                             // 21
        "- Charlie",                     // 22
    ];

    #[test]
    fn test_top_level_property_names_itself() {
        assert_eq!(property_for_line(PROJECT_NOTE, 2, 14).as_deref(), Some("name"));
        assert_eq!(smart_context(PROJECT_NOTE, 2).as_deref(), Some("name"));
    }

    #[test]
    fn test_list_item_resolves_to_parent_key() {
        assert_eq!(
            smart_context(PROJECT_NOTE, 4).as_deref(),
            Some("mentioned_projects")
        );
        assert_eq!(
            smart_context(PROJECT_NOTE, 5).as_deref(),
            Some("mentioned_projects")
        );
        assert_eq!(smart_context(PROJECT_NOTE, 13).as_deref(), Some("links"));
    }

    #[test]
    fn test_nested_properties() {
        assert_eq!(smart_context(PROJECT_NOTE, 7).as_deref(), Some("team_lead"));
        assert_eq!(smart_context(PROJECT_NOTE, 9).as_deref(), Some("developers"));
        // blank line between items is skipped on the way up
        assert_eq!(smart_context(PROJECT_NOTE, 11).as_deref(), Some("developers"));
        // a bare header line has nothing shallower above it
        assert_eq!(smart_context(PROJECT_NOTE, 3), None);
    }

    #[test]
    fn test_nested_yaml_list_item() {
        let lines = ["---", "mentioned_projects:", "  - ProjectAlpha", "---"];
        assert_eq!(
            smart_context(&lines, 3).as_deref(),
            Some("mentioned_projects")
        );
    }

    #[test]
    fn test_property_resolution_is_stable() {
        let first = smart_context(PROJECT_NOTE, 9);
        for _ in 0..3 {
            assert_eq!(smart_context(PROJECT_NOTE, 9), first);
        }
    }

    #[test]
    fn test_dash_prefixed_key_is_not_a_property() {
        let lines = ["---", "people:", "  - name: Ann", "---"];
        assert_eq!(smart_context(&lines, 3).as_deref(), Some("people"));
    }

    #[test]
    fn test_heading_resolution() {
        assert_eq!(smart_context(PROJECT_NOTE, 16).as_deref(), Some("Introduction"));
        assert_eq!(smart_context(PROJECT_NOTE, 19).as_deref(), Some("Team Members"));
        // heading line resolves to itself
        assert_eq!(smart_context(PROJECT_NOTE, 17).as_deref(), Some("Team Members"));
        // bare `#` is skipped
        assert_eq!(smart_context(PROJECT_NOTE, 22).as_deref(), Some("Team Members"));
    }

    #[test]
    fn test_heading_three_lines_below() {
        let lines = ["intro", "", "", "", "## Team Members", "", "", "- Alice"];
        assert_eq!(heading_for_line(&lines, 8).as_deref(), Some("Team Members"));
    }

    #[test]
    fn test_no_heading_above() {
        let lines = ["plain", "text", "# Later"];
        assert_eq!(heading_for_line(&lines, 2), None);
        assert_eq!(heading_for_line(&lines, 0), None);
        assert_eq!(heading_for_line(&lines, 9), None);
    }
}
