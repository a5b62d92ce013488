use anyhow::Result;
use colored::*;

use rgvault_mcp::operations::{self, GetFrontmatterRequest};
use rgvault_mcp::vault::Vault;

use super::{header, print_json};

pub fn run(vault: &Vault, request: &GetFrontmatterRequest, json: bool) -> Result<()> {
    let result = operations::get_frontmatter(&vault.engine, request);
    if json {
        return print_json(result);
    }
    let report = result?;

    header(&format!("Frontmatter: {}", report.file));

    match report.frontmatter {
        Some(map) if !map.is_empty() => {
            for (key, value) in &map {
                let shown = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                println!("{}: {}", key.cyan(), shown);
            }
        }
        _ => println!("{}", "No frontmatter.".yellow()),
    }

    Ok(())
}
