use anyhow::Result;
use colored::*;

use rgvault_mcp::core::links::LinkKind;
use rgvault_mcp::operations::{self, SearchLinksRequest};
use rgvault_mcp::vault::Vault;

use super::{header, location, none_found, print_json};

fn kind_label(kind: LinkKind) -> ColoredString {
    match kind {
        LinkKind::WikiLink => "wiki".magenta(),
        LinkKind::MarkdownLink => "md".blue(),
        LinkKind::ExternalUrl => "url".yellow(),
    }
}

pub fn run(vault: &Vault, request: &SearchLinksRequest, json: bool) -> Result<()> {
    let result = operations::search_links(&vault.engine, &vault.defaults, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header("Links");
    println!("Type: {}", report.link_type);
    if let Some(url) = &report.filters.url_pattern {
        println!("URL filter: {}", url);
    }
    if let Some(title) = &report.filters.title_pattern {
        println!("Title filter: {}", title);
    }
    println!("Found: {} links", report.total_matches);
    println!();

    if report.results.is_empty() {
        none_found("links");
        return Ok(());
    }

    for link in &report.results {
        let target = if link.title == link.url {
            link.url.clone()
        } else {
            format!("{} -> {}", link.title, link.url)
        };
        println!(
            "{} {} {}",
            location(&link.file, link.line_number, None),
            kind_label(link.link_type),
            target
        );
    }

    Ok(())
}
