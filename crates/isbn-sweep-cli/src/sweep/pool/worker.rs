use super::request::{Outcome, PartitionReport, PoolError, WorkRequest};
use crate::sweep::telemetry::{increment_partitions_failed, record_partition};
use isbn_sweep::{Directory, Partition, PartitionSettings, run_partition_to_file};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything a worker holds for its whole lifetime.
pub struct WorkerContext {
    pub directory: Arc<Directory>,
    pub settings: PartitionSettings,
    pub output_dir: PathBuf,
    pub cancel: CancellationToken,
}

/// Blocking loop that processes [`WorkRequest`]s until shutdown.
///
/// Runs on a dedicated worker thread. Each partition is a fully synchronous
/// pipeline; the only shared state is the read-only directory.
pub fn worker_loop(worker_id: usize, mut rx: mpsc::Receiver<WorkRequest>, ctx: WorkerContext) {
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.blocking_recv() {
        match work {
            WorkRequest::Partition {
                partition,
                response,
            } => {
                let outcome = process(worker_id, &partition, &ctx);
                let defect = outcome.is_defect();
                let report = PartitionReport {
                    worker_id,
                    partition,
                    outcome,
                };
                if response.send(report).is_err() {
                    tracing::warn!("Worker {worker_id} could not deliver report for {partition}");
                }
                if defect {
                    tracing::error!("Worker {worker_id} terminating after malformed candidate");
                    break;
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}

fn process(worker_id: usize, partition: &Partition, ctx: &WorkerContext) -> Outcome {
    if ctx.cancel.is_cancelled() {
        tracing::info!("Skipping {partition}: run cancelled");
        return Outcome::Skipped;
    }

    let span = tracing::info_span!(
        "partition",
        worker = worker_id,
        prefix = %partition.prefix,
        index = partition.index
    );
    let _entered = span.enter();

    let cancel = || ctx.cancel.is_cancelled();
    match run_partition_to_file(
        partition,
        &ctx.directory,
        &ctx.settings,
        &ctx.output_dir,
        &cancel,
    ) {
        Ok(stats) => {
            record_partition(&stats);
            if stats.cancelled {
                tracing::warn!(
                    scanned = stats.scanned,
                    accepted = stats.accepted,
                    "Partition {partition} stopped early; output is partial"
                );
            } else {
                tracing::info!(
                    scanned = stats.scanned,
                    accepted = stats.accepted,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "Partition {partition} done"
                );
            }
            Outcome::Completed(stats)
        }
        Err(e) => {
            increment_partitions_failed();
            tracing::error!("Partition {partition} failed: {e}");
            Outcome::Failed(PoolError::Partition(e))
        }
    }
}
