#![doc = include_str!("../README.md")]

mod sweep;

use anyhow::{Context, bail};
use clap::Parser;
use isbn_sweep::Directory;
use std::sync::Arc;
use sweep::{
    config::{CliArgs, RunConfig},
    pool::WorkerPool,
    summary::RunSummary,
    telemetry::init_telemetry,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    let providers = init_telemetry()?;
    let res = run(config).await;
    providers.shutdown();
    res
}

async fn run(config: RunConfig) -> anyhow::Result<()> {
    log_startup_info(&config);

    let directory = Directory::from_path(&config.directory)?;
    for prefix in &config.prefixes {
        if !directory.contains_prefix(*prefix) {
            tracing::warn!("Prefix {prefix} is not in the directory; its files will be empty");
        }
    }

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let plan = config.plan()?;
    tracing::info!(
        partitions = plan.len(),
        candidates = plan.total_candidates(),
        "Sweeping {} groups in {} blocks",
        directory.group_count(),
        directory.block_count()
    );

    let token = CancellationToken::new();
    let signals = tokio::spawn(shutdown_signal(token.clone()));

    let pool = WorkerPool::spawn(&config, Arc::new(directory), token)
        .context("Failed to start worker threads")?;
    let reports = pool.run(plan).await;
    pool.shutdown().await;
    signals.abort();

    let summary = RunSummary::from_reports(&reports);
    summary.log();
    if !summary.is_success() {
        bail!("Run did not complete: {summary}");
    }
    Ok(())
}

fn log_startup_info(config: &RunConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting sweep with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting sweep into {} with {} workers",
            config.output_dir.display(),
            config.num_workers
        );
    }
}

/// Cancels `token` on Ctrl+C or SIGTERM. Workers see the cancellation between
/// batches and close their files cleanly.
async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, finishing current batches...");
    token.cancel();
}
