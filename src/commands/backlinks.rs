use anyhow::Result;
use colored::*;

use rgvault_mcp::operations::{self, SearchBacklinksRequest};
use rgvault_mcp::vault::Vault;

use super::{header, location, none_found, print_json, truncate};

pub fn run(vault: &Vault, request: &SearchBacklinksRequest, json: bool) -> Result<()> {
    let result = operations::search_backlinks(&vault.engine, &vault.defaults, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header(&format!("Backlinks to {}", report.target_note));
    println!("Found: {} backlinks", report.total_backlinks);
    println!();

    if report.backlinks.is_empty() {
        none_found("backlinks");
        return Ok(());
    }

    for link in &report.backlinks {
        println!("{}", location(&link.file, link.line_number, link.smart_context.as_deref()));
        println!("  {}", truncate(&link.context, 100).dimmed());
    }

    Ok(())
}
