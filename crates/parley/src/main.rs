use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parley::config::Config;
use parley::dispatch::Dispatcher;
use parley::gateway::{ChatTransport, TelegramTransport, run_event_loop};
use parley::language::LanguageCode;
use parley::pipeline::Pipeline;
use parley::services::Services;
use parley::session::SessionStore;
use parley_gateway_telegram::{TelegramConfig, TelegramGateway};

/// Buffered inbound events between the gateway and the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Voice and text translation bot")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "parley.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the bot (default).
    Serve,
    /// List supported target languages.
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.config).await,
        Command::Languages => {
            for language in LanguageCode::all() {
                println!("{:<6} {}", language.code(), language.label());
            }
            Ok(())
        }
    }
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;
    let bot_token = config.bot_token()?;

    let gateway = TelegramGateway::new(TelegramConfig { bot_token });
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(gateway.clone()));

    let services = Services::from_config(&config.services);
    let pipeline = Pipeline::new(services, Arc::clone(&transport), &config.pipeline);
    let sessions = SessionStore::with_event_limit(config.pipeline.max_tracked_events);
    let dispatcher = Arc::new(Dispatcher::new(sessions, pipeline, transport));

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let event_loop = tokio::spawn(run_event_loop(rx, dispatcher));

    info!(temp_dir = %config.pipeline.temp_dir.display(), "Parley started");
    gateway.run(tx).await;

    // The gateway owned the only sender; the loop drains in-flight events.
    event_loop.await.context("event loop panicked")?;
    info!("Parley stopped");
    Ok(())
}
