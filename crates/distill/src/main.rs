//! Distill CLI
//!
//! `distill serve` runs the HTTP API; `distill worker` runs worker loops.
//! Both share the database named by `DISTILL_DATABASE_PATH`.

use std::net::SocketAddr;
use std::process;

use clap::{Parser, Subcommand};
use distill::app::{worker_pool_config, App};
use distill::config::Settings;
use distill::logging;
use distill::WorkerPool;

#[derive(Parser)]
#[command(name = "distill")]
#[command(about = "Durable summarization job queue", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address (overrides DISTILL_BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Run worker loops until interrupted
    Worker {
        /// Number of loops in this process (overrides DISTILL_WORKER_CONCURRENCY)
        #[arg(long, short = 'n')]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = logging::init(settings.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Serve { bind } => {
            if let Some(addr) = bind {
                settings.bind_addr = addr;
            }
            run_serve(&settings).await
        }
        Commands::Worker { concurrency } => {
            if let Some(n) = concurrency.filter(|n| *n > 0) {
                settings.worker_concurrency = n;
            }
            run_worker(&settings).await
        }
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

async fn run_serve(settings: &Settings) -> distill::Result<()> {
    let app = App::open(settings)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
        tracing::info!("Received interrupt, shutting down");
    };
    let served = distill::api::serve(settings.bind_addr, app.service(), shutdown).await;

    app.close()?;
    served?;
    Ok(())
}

async fn run_worker(settings: &Settings) -> distill::Result<()> {
    let app = App::open(settings)?;
    let processor = app.processor(settings)?;

    tracing::info!(
        "Worker starting ({} loop(s), polling every {:?})",
        settings.worker_concurrency,
        settings.poll_interval
    );
    let pool = WorkerPool::start(worker_pool_config(settings), app.store.clone(), processor);

    let mut stopped = pool.subscribe();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Received interrupt, finishing in-flight jobs");
        }
        _ = stopped.wait_for(|stop| *stop) => {}
    }
    pool.shutdown();

    let outcome = pool.wait().await;
    app.close()?;

    let stats = outcome?;
    tracing::info!(
        "Worker exiting: {} succeeded, {} failed",
        stats.succeeded,
        stats.failed
    );
    Ok(())
}
