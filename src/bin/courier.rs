//! # Courier
//!
//! Process entry point. Each invocation runs one mode:
//!
//! - `run`: the mode selected by `UPDATE_MODE` and `BOT_MODE`
//! - `webhook`: handle one inbound update from stdin or `--input`
//! - `poll`: fetch and handle one `getUpdates` batch
//! - `worker`: pop and dispatch until interrupted
//! - `enqueue`: push inbound updates to the queue for a worker, taking them
//!   from the webhook input or a poll batch according to `BOT_MODE`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courier_core::client::HttpBotApi;
use courier_core::config::{AppConfig, ConfigLoader};
use courier_core::logging::init_structured_logging;
use courier_core::orchestration::{
    read_inbound_update, Disposition, Orchestrator, Route, RunMode,
};
use courier_core::updates::Update;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Queue and dispatch chat bot updates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Optional TOML configuration file, layered under the environment
    #[arg(short, long, env = "COURIER_CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mode selected by configuration
    Run {
        /// Webhook input file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Handle one inbound webhook update
    Webhook {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Push to the queue instead of dispatching
        #[arg(long)]
        enqueue: bool,
    },
    /// Fetch and handle one batch of updates
    Poll {
        #[arg(long)]
        enqueue: bool,
    },
    /// Pop and dispatch queued updates until interrupted
    Worker,
    /// Push inbound updates to the queue
    Enqueue {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("invalid configuration")?;
    init_structured_logging(&config.logging);
    config.log_summary();
    config
        .ensure_data_layout()
        .context("failed to prepare data directory")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(run(cli.command, config))
}

async fn run(command: Option<Commands>, config: AppConfig) -> Result<()> {
    let client = Arc::new(HttpBotApi::new(&config.bot, &config.polling)?);
    let orchestrator = Orchestrator::from_config(&config, client).await?;

    let command = command.unwrap_or(Commands::Run { input: None });
    let (mode, route, input) = match command {
        Commands::Run { input } => (RunMode::from_config(&config), Route::Dispatch, input),
        Commands::Webhook { input, enqueue } => (RunMode::Webhook, route_for(enqueue), input),
        Commands::Poll { enqueue } => (RunMode::Poll, route_for(enqueue), None),
        Commands::Worker => (RunMode::QueueWorker, Route::Dispatch, None),
        Commands::Enqueue { input } => (RunMode::producer_for(config.bot.mode), Route::Enqueue, input),
    };

    info!(mode = %mode, ?route, backend = orchestrator.queue().backend(), "Courier starting");

    match mode {
        RunMode::Webhook => {
            let update = read_input(input.as_deref())?;
            match orchestrator.run_webhook(update, route).await {
                Disposition::Dispatched(report) if report.has_failures() => {
                    warn!(failures = report.failures().count(), "Dispatch completed with failures");
                }
                Disposition::NotEnqueued => error!("Update was not queued"),
                _ => {}
            }
        }
        RunMode::Poll => {
            let summary = orchestrator.run_poll(route).await?;
            info!(
                fetched = summary.fetched,
                handled = summary.handled,
                offset = summary.offset,
                "Poll batch complete"
            );
        }
        RunMode::QueueWorker => {
            orchestrator
                .run_worker_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!(error = %e, "Failed to listen for shutdown signal");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
    }

    info!("Execution completed");
    Ok(())
}

fn route_for(enqueue: bool) -> Route {
    if enqueue {
        Route::Enqueue
    } else {
        Route::Dispatch
    }
}

fn read_input(path: Option<&Path>) -> Result<Update> {
    let update = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            read_inbound_update(file)?
        }
        None => read_inbound_update(io::stdin().lock())?,
    };
    Ok(update)
}
