use anyhow::Result;
use colored::*;

use rgvault_mcp::operations::{self, SearchNotesRequest};
use rgvault_mcp::vault::Vault;

use super::{header, location, none_found, print_json, truncate};

pub fn run(vault: &Vault, request: &SearchNotesRequest, json: bool) -> Result<()> {
    let result = operations::search_notes(&vault.engine, &vault.defaults, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header("Search Results");
    println!("Query: \"{}\" ({})", report.query, report.search_scope);
    println!("Found: {} matches", report.total_matches);
    println!();

    if report.results.is_empty() {
        none_found("matches");
        return Ok(());
    }

    for hit in &report.results {
        println!("{}", location(&hit.file, hit.line_number, hit.smart_context.as_deref()));
        println!("  {}", truncate(&hit.snippet, 100).dimmed());
    }

    Ok(())
}
