use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod ai;
mod api;
mod app;
mod config;
mod db;
mod digest;
mod error;
mod models;
mod scrape;
mod services;
#[cfg(test)]
mod testing;

use app::App;
use config::Config;
use models::SubmitStatus;
use scrape::{ScrapeReceiver, WorkerPool};

/// Collects shared conversation links and posts a daily group digest.
#[derive(Parser, Debug)]
#[command(name = "riff-digest")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scrape workers, the periodic dispatcher and the HTTP server (default)
    Serve,
    #[command(flatten)]
    Once(OnceCommand),
}

/// Commands that run against the store once and exit.
#[derive(Subcommand, Debug)]
enum OnceCommand {
    /// Submit a share link and scrape it right away
    Submit { url: String, submitter: String },
    /// List everyone who has submitted a link
    Users,
    /// Show a submitter's links, newest first
    History { submitter: String },
    /// Show the full record for one link
    Show { url: String },
    /// List scraped links for a day
    Daily {
        /// Day to list (YYYY-MM-DD), today in UTC by default
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run a dispatch cycle now, even if everything was already shared
    Dispatch,
    /// Scrape every link that still lacks content
    Sweep,
    /// Mark links as already shared to the group
    MarkShared {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Clear every share marker
    ResetShared,
    /// Reset share markers, scrape everything pending, then dispatch
    FullFlow,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Once(command) => run_once(&config, command).await,
    }
}

async fn open_app(config: &Config) -> anyhow::Result<(App, ScrapeReceiver)> {
    App::new(config)
        .await
        .with_context(|| format!("Failed to open store at {}", config.db_path))
}

async fn run_once(config: &Config, command: OnceCommand) -> anyhow::Result<()> {
    // Keep the receiver alive so intake still reports `queued`.
    let (app, _receiver) = open_app(config).await?;

    match command {
        OnceCommand::Submit { url, submitter } => {
            let receipt = app.submit(&url, &submitter).await?;
            print_json(&receipt)?;
            if receipt.status != SubmitStatus::AlreadyExists {
                let outcome = app.scrape_now(&receipt.url).await?;
                println!("Scrape: {:?}", outcome);
            }
        }
        OnceCommand::Users => print_json(&app.submitters().await?)?,
        OnceCommand::History { submitter } => print_json(&app.history(&submitter).await?)?,
        OnceCommand::Show { url } => print_json(&app.show(&url).await?)?,
        OnceCommand::Daily { date } => print_json(&app.daily(date).await?)?,
        OnceCommand::Dispatch => print_json(&app.trigger_digest().await?)?,
        OnceCommand::Sweep => print_json(&app.scrape_pending_now().await?)?,
        OnceCommand::MarkShared { urls } => {
            let marked = app.mark_shared(&urls).await?;
            println!("Marked {} of {} links as shared", marked, urls.len());
        }
        OnceCommand::ResetShared => {
            let reset = app.reset_shared().await?;
            println!("Reset {} share markers", reset);
        }
        OnceCommand::FullFlow => print_json(&app.full_flow().await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting riff-digest");

    let (app, receiver) = open_app(config).await?;
    let app = Arc::new(app);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = WorkerPool::spawn(
        config.scrape_workers,
        receiver,
        app.worker(),
        shutdown_rx.clone(),
    );
    tracing::info!(workers = workers.len(), "Scrape workers started");

    // Pick up links left pending by a previous run.
    if let Err(e) = app.sweep().await {
        tracing::error!(error = %e, "Startup sweep failed");
    }

    let dispatcher = tokio::spawn(
        app.dispatcher()
            .run_periodic(config.digest_interval(), shutdown_rx),
    );

    let router = api::build_router(api::AppState::new(Arc::clone(&app))).layer(api::trace_layer());

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining background tasks");
    let _ = shutdown_tx.send(true);
    workers.join().await;
    if let Err(e) = dispatcher.await {
        tracing::error!(error = %e, "Dispatcher task panicked");
    }

    tracing::info!("Shut down gracefully");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Command> {
        Cli::try_parse_from(std::iter::once("riff-digest").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn serve_is_kept_apart_from_one_shot_commands() {
        assert!(parse(&[]).is_none());
        assert!(matches!(parse(&["serve"]), Some(Command::Serve)));
        assert!(matches!(
            parse(&["dispatch"]),
            Some(Command::Once(OnceCommand::Dispatch))
        ));
    }

    #[test]
    fn one_shot_arguments_parse() {
        match parse(&["mark-shared", "https://chatgpt.com/share/a", "https://chatgpt.com/share/b"]) {
            Some(Command::Once(OnceCommand::MarkShared { urls })) => assert_eq!(urls.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match parse(&["daily", "--date", "2025-01-31"]) {
            Some(Command::Once(OnceCommand::Daily { date })) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 31))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["riff-digest", "mark-shared"]).is_err());
    }
}
