use anyhow::Result;
use colored::*;

use rgvault_mcp::operations::{self, SearchRecentNotesRequest};
use rgvault_mcp::vault::Vault;

use super::{header, none_found, print_json};

pub fn run(vault: &Vault, request: &SearchRecentNotesRequest, json: bool) -> Result<()> {
    let result = operations::search_recent_notes(&vault.engine, &vault.defaults, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header("Recent Notes");
    println!(
        "Range: {} .. {}",
        report.date_range.start_date.as_deref().unwrap_or("*"),
        report.date_range.end_date.as_deref().unwrap_or("*")
    );
    println!("Found: {} files", report.total_files);
    println!();

    if report.files.is_empty() {
        none_found("notes");
        return Ok(());
    }

    for file in &report.files {
        println!(
            "{}  {}",
            file.modified_time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            file.file.cyan()
        );
    }

    Ok(())
}
