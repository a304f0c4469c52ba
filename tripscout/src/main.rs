//! TripScout CLI entry point

use std::fs;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{info, warn};

use tripscout::assistant::Assistant;
use tripscout::cli::{Cli, Command, WorkerKind, get_log_path};
use tripscout::config::Config;
use tripscout::llm::create_client;
use tripscout::prompts::PromptLoader;
use tripscout::services::{self, AccommodationClient, PoiClient};
use tripscout::session::{Console, Session, SessionSettings, TerminalConsole};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // log to a file so the terminal stays clean
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "TripScout loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        None => cmd_chat(&config, None).await,
        Some(Command::Chat { request }) => cmd_chat(&config, request).await,
        Some(Command::Search { request }) => cmd_search(&config, &request).await,
        Some(Command::Tools { worker }) => cmd_tools(&config, worker).await,
    }
}

fn build_session<C: Console>(config: &Config, console: C) -> Result<Session<C>> {
    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let assistant = Assistant::new(llm, PromptLoader::new(), config.search.default_location.clone());
    let accommodation = services::accommodation_client(config)?;
    let poi = services::poi_client(config)?;
    Ok(Session::new(
        SessionSettings::from_config(config),
        assistant,
        accommodation,
        poi,
        console,
    ))
}

/// Interactive session; workers are stopped however it ends
async fn cmd_chat(config: &Config, request: Option<String>) -> Result<()> {
    let mut session = build_session(config, TerminalConsole::new()?)?;
    let signals = ShutdownSignals::install()?;

    let outcome = tokio::select! {
        result = session.run(request) => result,
        _ = signals.wait() => {
            println!("\n{}", "Interrupted".yellow());
            Ok(())
        }
    };

    session.shutdown().await;
    outcome
}

/// One search, printed, then exit
async fn cmd_search(config: &Config, request: &str) -> Result<()> {
    let mut session = build_session(config, TerminalConsole::new()?)?;
    let signals = ShutdownSignals::install()?;

    let outcome = tokio::select! {
        result = session.search_once(request) => result.map(|count| info!(count, "One-shot search finished")),
        _ = signals.wait() => Ok(()),
    };

    session.shutdown().await;
    outcome
}

/// Print the tools a worker advertises
async fn cmd_tools(config: &Config, worker: WorkerKind) -> Result<()> {
    let (tools, name) = match worker {
        WorkerKind::Accommodation => {
            let mut client: AccommodationClient = services::accommodation_client(config)?;
            let tools = client.list_tools().await;
            client.shutdown().await;
            (tools, services::ACCOMMODATION_WORKER)
        }
        WorkerKind::Poi => {
            let mut client: PoiClient = services::poi_client(config)?;
            let tools = client.list_tools().await;
            client.shutdown().await;
            (tools, services::POI_WORKER)
        }
    };
    let tools = tools.context(format!("Failed to list tools of the {} worker", name))?;

    println!("{} ({} tools)", name.bright_cyan().bold(), tools.len());
    for tool in tools {
        println!("  {}", tool.name.yellow());
        if !tool.description.is_empty() {
            println!("      {}", tool.description);
        }
        if let Some(properties) = tool.input_schema.get("properties").and_then(|p| p.as_object()) {
            let names: Vec<&str> = properties.keys().map(String::as_str).collect();
            println!("      args: {}", names.join(", ").dimmed());
        }
    }
    Ok(())
}

/// SIGINT/SIGTERM listener, installed before the session starts
struct ShutdownSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            Ok(Self {
                sigint: signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?,
                sigterm: signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    async fn wait(mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigint.recv() => warn!("SIGINT received"),
                _ = self.sigterm.recv() => warn!("SIGTERM received"),
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received");
            }
        }
    }
}
