use anyhow::Result;
use colored::*;

use rgvault_mcp::operations::{self, SearchOrphanedNotesRequest};
use rgvault_mcp::vault::Vault;

use super::{header, print_json};

pub fn run(vault: &Vault, request: &SearchOrphanedNotesRequest, json: bool) -> Result<()> {
    let result = operations::search_orphaned_notes(&vault.engine, &vault.defaults, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header("Orphaned Notes");
    println!("Found: {} notes", report.total_orphaned);
    println!();

    if report.orphaned_notes.is_empty() {
        println!("{}", "✓ Every note links or is linked".green());
        return Ok(());
    }

    for note in &report.orphaned_notes {
        println!("{}  {}", note.modified_date.to_string().dimmed(), note.file.cyan());
    }

    Ok(())
}
