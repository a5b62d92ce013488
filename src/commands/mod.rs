pub mod backlinks;
pub mod frontmatter;
pub mod links;
pub mod orphans;
pub mod recent;
pub mod search;

use anyhow::Result;
use colored::*;
use serde::Serialize;

use rgvault_mcp::operations::{render, InputError};

/// Prints the JSON report (or error object) and reports success, matching
/// what the MCP tools return.
fn print_json<T: Serialize>(result: Result<T, InputError>) -> Result<()> {
    println!("{}", render(result));
    Ok(())
}

fn header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

fn none_found(what: &str) {
    println!("{}", format!("No {} found.", what).yellow());
}

fn truncate(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", chars[..max_chars].iter().collect::<String>())
    }
}

fn location(file: &str, line_number: usize, smart_context: Option<&str>) -> String {
    let mut out = format!("{}:{}", file.cyan(), line_number);
    if let Some(context) = smart_context {
        out.push_str(&format!(" [{}]", context.green()));
    }
    out
}
