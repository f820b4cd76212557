use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use postwatch::cli::Cli;
use postwatch::cli::commands::Commands;
use postwatch::config::Config;
use postwatch::cursor::CursorStore;
use postwatch::daemon::{Supervisor, stop_channel};
use postwatch::discovery::DiscoveryScheduler;
use postwatch::dispatch::{DispatchLoop, discovery_queue};
use postwatch::fetch::HttpFetcher;
use postwatch::handler::{HandlerRegistry, LogHandler};
use postwatch::parse::JsonPostParser;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("postwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("postwatch.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_daemon(config: &Config) -> Result<()> {
    info!("Starting discovery daemon");

    let (stop_tx, stop_rx) = stop_channel();

    let cursor = CursorStore::open(&config.storage.db_path, config.discovery.bootstrap_post_id)
        .context("Failed to open cursor store")?;

    let fetcher = Arc::new(HttpFetcher::new(&config.forum).context("Failed to build fetcher")?);

    let scheduler = Arc::new(
        DiscoveryScheduler::new(
            cursor,
            fetcher,
            config.rate.clone(),
            config.discovery.clone(),
            stop_rx.clone(),
        )
        .context("Failed to build scheduler")?,
    );

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(LogHandler));
    let registry = Arc::new(registry);

    let (tx, rx) = discovery_queue(config.dispatch.queue_capacity);
    let dispatch = DispatchLoop::new(
        rx,
        Arc::new(JsonPostParser),
        Arc::clone(&registry),
        &config.dispatch,
        stop_rx,
    );

    println!(
        "{} cursor {} (frontier {:?})",
        "Watching from".cyan(),
        scheduler.cursor_value().context("Failed to read cursor")?,
        scheduler.frontier_ids()
    );

    let supervisor = Supervisor::start(scheduler, tx, dispatch, stop_tx);
    supervisor.run().await.context("Daemon failed")?;

    println!("{}", "Stopped.".cyan());
    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let cursor = CursorStore::open(&config.storage.db_path, config.discovery.bootstrap_post_id)
        .context("Failed to open cursor store")?;
    let latest = cursor.get().context("Failed to read cursor")?;

    println!("{} {}", "Cursor:".green(), latest);
    println!("{} [{}]", "Frontier seed:".green(), latest + 1);
    println!(
        "{} {:.1}s (bounds {:.1}s..{:.1}s)",
        "Rate midpoint:".green(),
        config.rate.midpoint_secs(),
        config.rate.post_min_secs,
        config.rate.post_max_secs
    );
    println!("{} {}", "Store:".green(), config.storage.db_path.display());
    Ok(())
}

fn set_cursor(config: &Config, id: i64) -> Result<()> {
    let cursor = CursorStore::open(&config.storage.db_path, config.discovery.bootstrap_post_id)
        .context("Failed to open cursor store")?;

    let current = cursor.get().context("Failed to read cursor")?;
    if id < current {
        println!(
            "{} moving cursor backward: {} -> {}",
            "Warning:".yellow(),
            current,
            id
        );
    }

    cursor.set(id).context("Failed to set cursor")?;
    println!("{} {}", "Cursor set to".green(), id);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match cli.command {
        Commands::Run => run_daemon(&config).await,
        Commands::Status => show_status(&config),
        Commands::SetCursor { id } => set_cursor(&config, id),
    }
}
