use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pdfchat::app::App;
use pdfchat::chat::FALLBACK_ANSWER;
use pdfchat::config::Config;
use pdfchat::tui::{self, EventHandler, Tui};
use pdfchat::{handler, logging, ui, BackendClient};

#[derive(Parser)]
#[command(name = "pdfchat", version)]
#[command(about = "Chat with your indexed PDFs from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides config and PDFCHAT_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Status polling interval in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Timeout for each backend request, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs here instead of the default location
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the backend indexing status once and exit
    Status,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => logging::default_log_path()?,
    };
    if let Err(e) = logging::init(&log_path) {
        eprintln!("warning: logging disabled: {e:#}");
    }

    match cli.command {
        Some(Commands::Status) => print_status(&config).await,
        Some(Commands::Ask { question }) => ask_once(&config, &question).await,
        None => run_tui(config).await,
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_from(&path)?;
    config.apply_env();

    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

async fn print_status(config: &Config) -> Result<()> {
    let client = BackendClient::new(&config.backend_url, config.request_timeout())?;
    let status = client
        .status()
        .await
        .with_context(|| format!("failed to fetch status from {}", config.backend_url))?;

    println!("{}", status.summary());
    if let Some(err) = status.index_error() {
        println!("Index error: {}", err);
    }
    if let Some(at) = status.last_indexed_display() {
        println!("Last indexed: {}", at);
    }
    Ok(())
}

async fn ask_once(config: &Config, question: &str) -> Result<()> {
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "question must not be empty");

    let client = BackendClient::new(&config.backend_url, config.request_timeout())?;
    match client.chat(question).await {
        Ok(answer) => {
            println!("{}", answer.answer);
            for image in answer.images.unwrap_or_default() {
                println!("  [image] {}", client.resolve_image(&image));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "chat request failed");
            println!("{}", FALLBACK_ANSWER);
        }
    }
    Ok(())
}

async fn run_tui(config: Config) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender())?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    app.start();
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
