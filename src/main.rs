//! PriceWatch: polite retail price watcher
//!
//! Searches a retailer for a product, scores the results, tracks prices
//! across runs, and alerts on drops.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pricewatch::{
    config::Config,
    history::HistoryStore,
    notify::AlertConfig,
    pipeline::run_analysis,
    types::RunResult,
};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Polite retail price watcher")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pricewatch.toml")]
    config: PathBuf,

    /// Data directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a product and analyze the results
    Run {
        /// Product to search for
        query: String,

        /// Result pages to walk (overrides the config)
        #[arg(short, long)]
        pages: Option<usize>,
    },

    /// Show the stored price history
    History,

    /// Manage alert delivery settings
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },

    /// Write a starter configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AlertsAction {
    /// Show the current settings
    Show,

    /// Store delivery settings
    Set {
        /// Sender address
        #[arg(long)]
        sender: String,

        /// Sender app password
        #[arg(long)]
        password: String,

        /// Recipient address
        #[arg(long)]
        recipient: String,
    },

    /// Remove stored settings
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load or create config
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };

    // Override data dir if specified
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    // Setup logging
    let log_level = match cli.verbose {
        0 => config.logging.level.to_level(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    std::fs::create_dir_all(&config.storage.data_dir)?;

    match cli.command {
        Commands::Run { query, pages } => run_search(config, query, pages).await,
        Commands::History => show_history(config),
        Commands::Alerts { action } => manage_alerts(config, action),
        Commands::InitConfig { force } => init_config(&cli.config, force),
    }
}

async fn run_search(mut config: Config, query: String, pages: Option<usize>) -> Result<()> {
    let query = query.trim().to_string();
    if query.is_empty() {
        anyhow::bail!("Search query must not be empty");
    }
    if let Some(pages) = pages {
        config.crawler.max_pages = pages;
    }

    println!("\nSearching for: {}", query);
    let result = run_analysis(&query, &config).await?;
    print_result(&result);

    Ok(())
}

fn print_result(result: &RunResult) {
    if result.products.is_empty() {
        println!("\nNo products could be analyzed.");
        return;
    }

    println!("\nTop {} products:", result.products.len());
    println!("===============");
    for product in &result.products {
        println!(
            "\n#{} [{}] {}",
            product.rank,
            product.tier,
            truncate(&product.title, 70)
        );
        println!("   Price:    {:.2} EUR", product.price);
        if product.rating > 0.0 {
            println!("   Rating:   {:.1}/5", product.rating);
        }
        println!("   Shipping: {}", product.shipping);
        println!("   Score:    {:.1}/10", product.score);
        println!("   {}", product.source_url);
    }

    if !result.events.is_empty() {
        println!("\nPrice drops since last run:");
        println!("===========================");
        for event in &result.events {
            println!(
                "  {}: {:.2} -> {:.2} EUR (save {:.2})",
                truncate(&event.title, 50),
                event.previous_price,
                event.new_price,
                event.savings()
            );
        }
    }
}

fn show_history(config: Config) -> Result<()> {
    let store = HistoryStore::new(config.storage.history_path());
    let entries = store.entries();
    if entries.is_empty() {
        println!("No price history recorded yet.");
        return Ok(());
    }

    println!("\nPrice history ({} products):", entries.len());
    println!("============================");
    for entry in &entries {
        println!(
            "  {:>10.2} EUR  {}  ({})",
            entry.last_price,
            truncate(&entry.title, 60),
            entry.last_observed_at
        );
    }

    Ok(())
}

fn manage_alerts(config: Config, action: AlertsAction) -> Result<()> {
    let path = config.storage.alerts_path();

    match action {
        AlertsAction::Show => {
            let alert_config = AlertConfig::load(&path);
            println!("\nAlert settings ({}):", path.display());
            println!(
                "  Sender:    {}",
                alert_config.sender_email.as_deref().unwrap_or("<unset>")
            );
            println!(
                "  Password:  {}",
                if alert_config.app_password.is_some() {
                    "********"
                } else {
                    "<unset>"
                }
            );
            println!(
                "  Recipient: {}",
                alert_config.recipient_email.as_deref().unwrap_or("<unset>")
            );
            println!("  Complete:  {}", alert_config.is_complete());
        }
        AlertsAction::Set {
            sender,
            password,
            recipient,
        } => {
            let alert_config = AlertConfig {
                sender_email: Some(sender),
                app_password: Some(password),
                recipient_email: Some(recipient),
            };
            alert_config.save(&path)?;
            println!("Alert settings saved to {}", path.display());
        }
        AlertsAction::Clear => {
            if path.exists() {
                std::fs::remove_file(&path)?;
                println!("Alert settings removed.");
            } else {
                println!("No alert settings stored.");
            }
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = Config::default();
    let toml_content = format!(
        r#"# PriceWatch configuration

[crawler]
search_url_base = "{}"
product_link_marker = "{}"
max_pages = {}
result_quota = {}
links_per_page = {}
search_ready_selector = "{}"
product_ready_selector = "{}"

[politeness]
user_agent = "{}"
default_delay_ms = {}
request_timeout_secs = {}
robots_cache_size = {}
robots_cache_ttl_secs = {}

[storage]
data_dir = "{}"
history_file = "{}"
alerts_file = "{}"

[logging]
level = "{}"
"#,
        config.crawler.search_url_base,
        config.crawler.product_link_marker,
        config.crawler.max_pages,
        config.crawler.result_quota,
        config.crawler.links_per_page,
        config.crawler.search_ready_selector,
        config.crawler.product_ready_selector,
        config.politeness.user_agent,
        config.politeness.default_delay_ms,
        config.politeness.request_timeout_secs,
        config.politeness.robots_cache_size,
        config.politeness.robots_cache_ttl_secs,
        config.storage.data_dir.display(),
        config.storage.history_file,
        config.storage.alerts_file,
        config.logging.level,
    );

    std::fs::write(path, toml_content)?;
    println!("Created configuration file: {}", path.display());

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.len() > max_len {
        // Find a valid char boundary at or before max_len
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    } else {
        s
    }
}
