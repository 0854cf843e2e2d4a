use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{InMemoryScoringService, RemoteScoringService, ScoringService, SessionController};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod view;

use config::{load_settings, Backend, Settings};
use driver::drive;

#[derive(Parser, Debug)]
#[command(about = "Log in with your code and roll the dice for your chances")]
struct Args {
    /// Scoring service endpoint; overrides the settings file and environment.
    #[arg(long)]
    service_url: Option<String>,
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[arg(long)]
    reveal_delay_ms: Option<u64>,
    #[arg(long, default_value = "dice.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = merge_args(load_settings(&args.config)?, &args);
    let service = build_service(&settings)?;
    info!(
        backend = ?settings.backend,
        reveal_delay_ms = settings.reveal_delay_ms,
        "starting"
    );

    let controller = SessionController::new(service)
        .with_reveal_delay(Duration::from_millis(settings.reveal_delay_ms));
    run(controller).await
}

fn merge_args(mut settings: Settings, args: &Args) -> Settings {
    if let Some(v) = &args.service_url {
        settings.service_url = Some(v.clone());
    }
    if let Some(v) = args.backend {
        settings.backend = v;
    }
    if let Some(v) = args.reveal_delay_ms {
        settings.reveal_delay_ms = v;
    }
    settings
}

fn build_service(settings: &Settings) -> Result<Arc<dyn ScoringService>> {
    match settings.backend {
        Backend::Remote => {
            let url = settings.service_url.as_deref().unwrap_or_default();
            let service = RemoteScoringService::new(url)
                .context("remote backend needs a valid --service-url")?;
            info!(endpoint = %service.endpoint(), "using remote scoring service");
            Ok(Arc::new(service))
        }
        Backend::Memory => {
            info!("using in-memory demo players");
            Ok(Arc::new(InMemoryScoringService::with_demo_players()))
        }
    }
}

async fn run(mut controller: SessionController) -> Result<()> {
    let mut frames = controller.frames();
    let mut input = spawn_stdin_reader();
    let mut out = std::io::stdout();
    drive(&mut controller, &mut frames, &mut input, &mut out).await
}

/// Blocking stdin reads live on their own thread so a pending read never
/// holds up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    warn!(%error, "failed to read input");
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
