mod commands;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use rgvault_mcp::config::Config;
use rgvault_mcp::logging;
use rgvault_mcp::operations::{
    GetFrontmatterRequest, SearchBacklinksRequest, SearchLinksRequest, SearchNotesRequest,
    SearchOrphanedNotesRequest, SearchRecentNotesRequest,
};
use rgvault_mcp::vault::Vault;

#[derive(Parser)]
#[command(name = "rgvault")]
#[command(about = "Ripgrep-powered search for Obsidian vaults, as a CLI and an MCP server", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Config file (JSON)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Vault root (overrides config and OBSIDIAN_VAULT_PATH)")]
    vault: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log at the configured level instead of warnings only")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Case matching; the configured default applies when neither flag is given.
#[derive(Args, Debug)]
struct CaseArgs {
    #[arg(short = 's', long, help = "Case sensitive")]
    case_sensitive: bool,
    #[arg(short = 'i', long, conflicts_with = "case_sensitive", help = "Case insensitive")]
    ignore_case: bool,
}

impl CaseArgs {
    fn resolve(&self) -> Option<bool> {
        if self.case_sensitive {
            Some(true)
        } else if self.ignore_case {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Regex search over notes
    Search {
        query: String,
        #[arg(long, default_value = "all", help = "all, content_only or frontmatter_only")]
        scope: String,
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, help = "Limit to a folder")]
        folder: Option<String>,
        #[arg(short, long, help = "Limit results (1-100)")]
        limit: Option<i64>,
        #[arg(long, help = "Skip smart context")]
        no_context: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// List links (wiki, Markdown, external)
    Links {
        #[arg(long = "type", default_value = "all", help = "all, wiki_links, markdown_links or external_urls")]
        link_type: String,
        #[arg(long, help = "Regex the URL must match")]
        url: Option<String>,
        #[arg(long, help = "Regex the title must match")]
        title: Option<String>,
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, help = "Limit to a folder")]
        folder: Option<String>,
        #[arg(short, long, help = "Limit results (1-100)")]
        limit: Option<i64>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Notes linking to a note
    Backlinks {
        note: String,
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, help = "Limit to a folder")]
        folder: Option<String>,
        #[arg(short, long, help = "Limit results (1-100)")]
        limit: Option<i64>,
        #[arg(long, help = "Skip smart context")]
        no_context: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Notes modified in a date range
    Recent {
        #[arg(long, help = "Start date (YYYY-MM-DD)")]
        from: Option<String>,
        #[arg(long, help = "End date (YYYY-MM-DD)")]
        to: Option<String>,
        #[arg(long, help = "Limit to a folder")]
        folder: Option<String>,
        #[arg(short, long, help = "Limit results (1-100)")]
        limit: Option<i64>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Notes with no incoming or outgoing links
    Orphans {
        #[command(flatten)]
        case: CaseArgs,
        #[arg(long, help = "Limit to a folder")]
        folder: Option<String>,
        #[arg(short, long, help = "Limit results (1-100)")]
        limit: Option<i64>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show a note's frontmatter
    Frontmatter {
        file: String,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    // ===== MCP Server =====
    /// Start MCP server on stdio
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP host configuration instructions")]
        install: bool,
    },
}

impl Commands {
    fn is_server(&self) -> bool {
        #[cfg(feature = "mcp")]
        if let Commands::Mcp { install } = self {
            return !install;
        }
        false
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(vault) = cli.vault {
        config.vault_path = Some(vault);
    }

    // stderr stays quiet for one-shot commands unless asked
    let level = if cli.verbose || cli.command.is_server() {
        config.log_level.as_str()
    } else {
        "warn"
    };
    logging::init(level);

    let open = || Vault::open(&config).context("cannot open vault");

    match cli.command {
        Commands::Search {
            query,
            scope,
            case,
            folder,
            limit,
            no_context,
            json,
        } => commands::search::run(
            &open()?,
            &SearchNotesRequest {
                query,
                search_scope: Some(scope),
                case_sensitive: case.resolve(),
                folder,
                max_results: limit,
                smart_context: Some(!no_context),
            },
            json,
        ),
        Commands::Links {
            link_type,
            url,
            title,
            case,
            folder,
            limit,
            json,
        } => commands::links::run(
            &open()?,
            &SearchLinksRequest {
                link_type: Some(link_type),
                url_pattern: url,
                title_pattern: title,
                case_sensitive: case.resolve(),
                folder,
                max_results: limit,
            },
            json,
        ),
        Commands::Backlinks {
            note,
            case,
            folder,
            limit,
            no_context,
            json,
        } => commands::backlinks::run(
            &open()?,
            &SearchBacklinksRequest {
                target_note: note,
                case_sensitive: case.resolve(),
                folder,
                max_results: limit,
                smart_context: Some(!no_context),
            },
            json,
        ),
        Commands::Recent {
            from,
            to,
            folder,
            limit,
            json,
        } => commands::recent::run(
            &open()?,
            &SearchRecentNotesRequest {
                start_date: from,
                end_date: to,
                folder,
                max_results: limit,
            },
            json,
        ),
        Commands::Orphans {
            case,
            folder,
            limit,
            json,
        } => commands::orphans::run(
            &open()?,
            &SearchOrphanedNotesRequest {
                case_sensitive: case.resolve(),
                folder,
                max_results: limit,
            },
            json,
        ),
        Commands::Frontmatter { file, json } => {
            commands::frontmatter::run(&open()?, &GetFrontmatterRequest { file }, json)
        }

        // ===== MCP Server =====
        #[cfg(feature = "mcp")]
        Commands::Mcp { install } => {
            if install {
                print_mcp_install_instructions(&config);
                Ok(())
            } else {
                run_mcp_server(&config)
            }
        }
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server(config: &Config) -> anyhow::Result<()> {
    let vault = match Vault::open(config) {
        Ok(vault) => vault,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            tracing::error!(
                "OBSIDIAN_VAULT_PATH={:?}, cwd={:?}",
                std::env::var(rgvault_mcp::config::ENV_VAULT_PATH).ok(),
                std::env::current_dir().ok()
            );
            return Err(e.into());
        }
    };
    vault.smoke_test();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(rgvault_mcp::mcp::run_mcp_server(vault))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions(config: &Config) {
    use colored::Colorize;

    let vault_path = config
        .vault_path
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "/path/to/your/vault".to_string());

    let binary_path = std::env::current_exe()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "rgvault".to_string());

    println!("{}", "MCP Server Installation Guide".bold().cyan());
    println!();
    println!("Add the following to your MCP host configuration:");
    println!();
    println!("{}", "For Claude Desktop (claude_desktop_config.json):".dimmed());
    println!(
        r#"{{
  "mcpServers": {{
    "rgvault": {{
      "command": "{}",
      "args": ["mcp"],
      "env": {{
        "OBSIDIAN_VAULT_PATH": "{}"
      }}
    }}
  }}
}}"#,
        binary_path, vault_path
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!("  • {} - Regex search scoped to frontmatter or body", "search_notes".green());
    println!("  • {} - Wiki links, Markdown links and URLs", "search_links".green());
    println!("  • {} - Notes linking to a note", "search_backlinks".green());
    println!("  • {} - Notes modified in a date range", "search_recent_notes".green());
    println!("  • {} - Notes with no links in or out", "search_orphaned_notes".green());
    println!("  • {} - A note's frontmatter as JSON", "get_frontmatter".green());
}
