//! Command-line front end for the shortlink core.
//!
//! Every command goes through [`UrlService`](shortlink::application::services::UrlService),
//! so cache population, ownership checks and click deduplication behave exactly
//! as they would behind any other front end.
//!
//! # Usage
//!
//! ```bash
//! # Shorten a URL with a random code
//! shortlink shorten https://www.rust-lang.org
//!
//! # Custom code, one hour expiry, owned by "alice"
//! shortlink shorten https://docs.rs --code docs --ttl 3600 --creator alice
//!
//! # Resolve a code and record a visit
//! shortlink visit docs --ip 203.0.113.7 --user-agent "Mozilla/5.0 ... Firefox/121.0"
//!
//! # Click analytics
//! shortlink analytics docs
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `CACHE_BACKEND`, `REDIS_URL`, `CACHE_TTL_SECONDS`: cache selection
//! - `OPERATION_TIMEOUT_SECONDS`: deadline for a single command
//!
//! See [`shortlink::config`] for the full list.

use shortlink::bootstrap;
use shortlink::config::load_from_env;
use shortlink::domain::click_event::ClickEvent;
use shortlink::domain::entities::ShortUrl;
use shortlink::state::AppState;
use shortlink::telemetry::init_tracing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::collections::BTreeMap;
use std::time::Duration;

/// CLI tool for creating and managing short URLs.
#[derive(Parser)]
#[command(name = "shortlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a short URL
    Shorten {
        /// Destination URL (http or https)
        url: String,

        /// Custom short code instead of a random one
        #[arg(short, long)]
        code: Option<String>,

        /// Display title
        #[arg(short, long)]
        title: Option<String>,

        /// Lifetime in seconds (0 or absent: never expires)
        #[arg(long)]
        ttl: Option<u64>,

        /// Owner reference for later updates and deletions
        #[arg(long)]
        creator: Option<String>,
    },

    /// Show a live record by short code
    Get { short: String },

    /// Find the live record for a destination URL
    Lookup { url: String },

    /// List live records owned by a creator
    List {
        #[arg(long)]
        creator: String,
    },

    /// Change the destination, title or expiry of a record
    Update {
        short: String,

        /// New destination URL
        #[arg(short, long)]
        url: Option<String>,

        /// New title (empty string clears it)
        #[arg(short, long)]
        title: Option<String>,

        /// New lifetime in seconds from now
        #[arg(long)]
        ttl: Option<u64>,

        /// Restrict the update to this owner
        #[arg(long)]
        creator: Option<String>,
    },

    /// Soft-delete a record
    Delete {
        short: String,

        /// Restrict the deletion to this owner
        #[arg(long)]
        creator: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Permanently remove a record with its clicks and history
    Purge {
        short: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Resolve a code and record a visit
    Visit {
        short: String,

        #[arg(long, default_value = "127.0.0.1")]
        ip: String,

        #[arg(long)]
        user_agent: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// List recorded clicks, newest first
    Clicks {
        short: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show click counts by browser, device and location
    Analytics { short: String },

    /// Check database and cache connectivity
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_from_env()?;
    init_tracing(&config.log_level, &config.log_format)?;

    // Prompts run before the deadline starts.
    if !confirm(&cli.command)? {
        println!("{}", "Cancelled".red());
        return Ok(());
    }

    let state = bootstrap::initialize(&config).await?;
    let deadline = Duration::from_secs(config.operation_timeout_seconds);

    let outcome = tokio::time::timeout(deadline, run(cli.command, &state)).await;

    state.shutdown().await;

    match outcome {
        Ok(result) => result,
        Err(_) => anyhow::bail!(
            "Operation timed out after {}s",
            config.operation_timeout_seconds
        ),
    }
}

/// Asks for confirmation before destructive commands.
fn confirm(command: &Commands) -> Result<bool> {
    let prompt = match command {
        Commands::Delete { short, yes: false, .. } => format!("Delete '{}'?", short),
        Commands::Purge { short, yes: false } => format!(
            "Permanently remove '{}' with all its clicks and history?",
            short
        ),
        _ => return Ok(true),
    };

    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

async fn run(command: Commands, state: &AppState) -> Result<()> {
    let service = &state.url_service;

    match command {
        Commands::Shorten {
            url,
            code,
            title,
            ttl,
            creator,
        } => {
            let created = service
                .create_short_url(url, code, title, ttl.map(Duration::from_secs), creator)
                .await
                .context("Failed to create short URL")?;

            println!("{}", "Short URL created".green().bold());
            println!();
            print_url(&created);
        }
        Commands::Get { short } => {
            let url = service.get_by_short(&short).await?;
            print_url(&url);
        }
        Commands::Lookup { url } => {
            let found = service.get_by_original(&url).await?;
            print_url(&found);
        }
        Commands::List { creator } => {
            let urls = service.get_by_creator(&creator).await?;
            print_url_list(&urls);
        }
        Commands::Update {
            short,
            url,
            title,
            ttl,
            creator,
        } => {
            let current = service.get_by_short(&short).await?;
            let original = url.unwrap_or(current.original);
            let title = title.or(current.title);
            let ttl = ttl.map(Duration::from_secs);

            let updated = match creator {
                Some(creator) => {
                    service
                        .update_url_with_creator(&short, title, original, ttl, &creator)
                        .await?
                }
                None => service.update_url(&short, title, original, ttl).await?,
            };

            println!("{}", "Short URL updated".green().bold());
            println!();
            print_url(&updated);
        }
        Commands::Delete { short, creator, .. } => {
            match creator {
                Some(creator) => service.delete_with_creator(&short, &creator).await?,
                None => service.delete(&short).await?,
            }
            println!("{}", format!("Deleted '{}'", short).green().bold());
        }
        Commands::Purge { short, .. } => {
            if service.purge(&short).await? {
                println!("{}", format!("Purged '{}'", short).green().bold());
            } else {
                println!("{}", format!("No record uses '{}'", short).yellow());
            }
        }
        Commands::Visit {
            short,
            ip,
            user_agent,
            location,
        } => {
            let url = service.get_by_short(&short).await?;
            println!("  {} {}", "->".bright_black(), url.original.bright_cyan());

            let event = ClickEvent::new(short, ip, user_agent.as_deref(), location.as_deref());
            if !state.clicks.record(event) {
                println!("{}", "Click queue full, visit not recorded".yellow());
            }
        }
        Commands::Clicks { short, limit } => {
            let clicks = service.get_clicks_by_short(&short).await?;
            print_clicks(&short, &clicks, limit);
        }
        Commands::Analytics { short } => {
            let analytics = service.get_click_analytics(&short).await?;

            println!("{}", format!("Analytics for '{}'", short).bright_blue().bold());
            println!();
            println!(
                "  Total clicks: {}",
                analytics.total_clicks.to_string().bright_green().bold()
            );
            print_breakdown("Browsers", &analytics.browsers);
            print_breakdown("Devices", &analytics.devices);
            print_breakdown("Locations", &analytics.locations);
            println!();
        }
        Commands::Check => {
            println!("{}", "Checking connections...".bright_blue());

            sqlx::query("SELECT 1")
                .fetch_one(state.pool.as_ref())
                .await
                .context("Database check failed")?;
            println!("  Database: {}", "OK".green().bold());

            if service.cache_healthy().await {
                println!("  Cache:    {}", "OK".green().bold());
            } else {
                println!("  Cache:    {}", "UNAVAILABLE".red().bold());
            }
        }
    }

    Ok(())
}

fn print_url(url: &ShortUrl) {
    println!("  Code:     {}", url.short.bright_yellow().bold());
    println!("  Target:   {}", url.original.cyan());
    if let Some(title) = &url.title {
        println!("  Title:    {}", title);
    }
    println!(
        "  Created:  {}",
        url.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
    );
    match url.expires_at {
        Some(expires_at) => println!(
            "  Expires:  {}",
            expires_at.format("%Y-%m-%d %H:%M").to_string().bright_black()
        ),
        None => println!("  Expires:  {}", "never".bright_black()),
    }
    println!("  Clicks:   {}", url.clicks.to_string().bright_green());
    if let Some(creator) = &url.creator_reference {
        println!("  Creator:  {}", creator);
    }
    println!();
}

fn print_url_list(urls: &[ShortUrl]) {
    if urls.is_empty() {
        println!("{}", "  No short URLs found".yellow());
        return;
    }

    println!(
        "  {:<12} {:<8} {:<18} {}",
        "Code".bright_white().bold(),
        "Clicks".bright_white().bold(),
        "Created".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "-".repeat(75).bright_black());

    for url in urls {
        println!(
            "  {:<12} {:<8} {:<18} {}",
            url.short.cyan(),
            url.clicks,
            url.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black(),
            url.original
        );
    }

    println!();
    println!("  Total: {}", urls.len().to_string().bright_white().bold());
    println!();
}

fn print_clicks(short: &str, clicks: &[shortlink::domain::entities::Click], limit: usize) {
    println!("{}", format!("Clicks for '{}'", short).bright_blue().bold());
    println!();

    if clicks.is_empty() {
        println!("{}", "  No clicks recorded".yellow());
        return;
    }

    for click in clicks.iter().take(limit) {
        println!(
            "  {}  {:<15} {:<8} {:<8} {}",
            click.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
            click.ip,
            click.browser,
            click.device,
            click.location
        );
    }

    if clicks.len() > limit {
        println!("  {}", format!("... {} more", clicks.len() - limit).bright_black());
    }
    println!();
}

fn print_breakdown(label: &str, counts: &BTreeMap<String, i64>) {
    println!();
    println!("  {}", label.bright_white().bold());
    if counts.is_empty() {
        println!("    {}", "none".bright_black());
    }
    for (name, count) in counts {
        println!("    {:<20} {}", name, count);
    }
}
