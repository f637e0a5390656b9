//! Dispatch and shutdown of the blocking worker pool.
//!
//! Workers run on dedicated OS threads, not tokio's blocking pool. Each one
//! parks in `blocking_recv` for the whole run, so the worker count is not
//! bounded by the runtime's blocking-thread cap.

use super::{
    request::{Outcome, PartitionReport, PoolError, WorkRequest},
    worker::{WorkerContext, worker_loop},
};
use crate::sweep::config::RunConfig;
use core::time::Duration;
use futures::future::join_all;
use isbn_sweep::{Directory, Partition};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// A pool of blocking workers that process partitions.
///
/// Workers receive requests over bounded MPSC channels. Work is distributed in
/// round-robin fashion; with one partition per worker per prefix, every worker
/// gets exactly one partition of each prefix.
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    handles: Vec<JoinHandle<()>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawns `config.num_workers` worker threads, each holding a clone of
    /// `directory`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be started. Workers
    /// already started exit once their queue is dropped.
    pub fn spawn(
        config: &RunConfig,
        directory: Arc<Directory>,
        shutdown_token: CancellationToken,
    ) -> io::Result<Self> {
        let mut workers = Vec::with_capacity(config.num_workers);
        let mut handles = Vec::with_capacity(config.num_workers);
        // Room for every partition a worker can be assigned, so dispatch never
        // waits on a busy worker.
        let queue_depth = config.prefixes.len() + 1;

        for worker_id in 0..config.num_workers {
            let (tx, rx) = mpsc::channel(queue_depth);
            let ctx = WorkerContext {
                directory: Arc::clone(&directory),
                settings: config.settings,
                output_dir: config.output_dir.clone(),
                cancel: shutdown_token.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("isbn-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, rx, ctx))?;
            handles.push(handle);
            workers.push(tx);
        }

        Ok(Self {
            workers,
            handles,
            next_worker: AtomicUsize::new(0),
            shutdown_token,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Returns the index of the next worker to receive work (round-robin).
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sends `partition` to the next worker and returns the receiver its
    /// report will arrive on.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ChannelError`] if the worker has already exited.
    pub async fn dispatch(
        &self,
        partition: Partition,
    ) -> Result<(usize, oneshot::Receiver<PartitionReport>), PoolError> {
        let worker_idx = self.next_worker_index();
        let (tx, rx) = oneshot::channel();

        self.workers[worker_idx]
            .send(WorkRequest::Partition {
                partition,
                response: tx,
            })
            .await
            .map_err(|_| PoolError::ChannelError {
                context: format!("Worker {worker_idx} channel closed"),
            })?;

        Ok((worker_idx, rx))
    }

    /// Runs every partition of `plan` and waits for all reports.
    ///
    /// A failing partition never stops the others. Reports come back in plan
    /// order.
    pub async fn run(&self, plan: impl IntoIterator<Item = Partition>) -> Vec<PartitionReport> {
        let plan = plan.into_iter();
        let mut pending = Vec::with_capacity(plan.size_hint().0);
        for partition in plan {
            pending.push((partition, self.dispatch(partition).await));
        }

        let waits = pending.into_iter().map(|(partition, dispatched)| async move {
            match dispatched {
                Ok((worker_id, rx)) => rx.await.unwrap_or_else(|_| PartitionReport {
                    worker_id,
                    partition,
                    outcome: Outcome::Failed(PoolError::ChannelError {
                        context: format!("Worker {worker_id} exited before reporting"),
                    }),
                }),
                Err(e) => PartitionReport {
                    worker_id: usize::MAX,
                    partition,
                    outcome: Outcome::Failed(e),
                },
            }
        });

        join_all(waits).await
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared token so in-flight partitions stop at the next
    ///   batch.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker.
    /// - Waits up to `shutdown_timeout` per worker for acknowledgements.
    /// - Joins every worker thread that acknowledged or already exited. A
    ///   worker that timed out is left detached.
    pub async fn shutdown(self) {
        tracing::debug!("Notifying all workers to shut down");
        self.shutdown_token.cancel();
        let mut shutdown_handles = Vec::with_capacity(self.workers.len());

        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                tracing::warn!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let wait = self.shutdown_timeout;
        let acks = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(wait, rx).await {
                Ok(Ok(())) => tracing::trace!("Worker {i} shutdown acknowledged"),
                Ok(Err(e)) => tracing::error!("Worker {i} returned error: {e}"),
                Err(_) => {
                    tracing::warn!("Worker {i} shutdown timed out");
                    return Some(i);
                }
            }
            None
        });
        let timed_out: Vec<usize> = join_all(acks).await.into_iter().flatten().collect();

        drop(self.workers);
        let handles: Vec<(usize, JoinHandle<()>)> = self
            .handles
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !timed_out.contains(i))
            .collect();
        let joined = tokio::task::spawn_blocking(move || {
            for (i, handle) in handles {
                if handle.join().is_err() {
                    tracing::error!("Worker {i} panicked");
                }
            }
        })
        .await;
        if let Err(e) = joined {
            tracing::error!("Failed to join worker threads: {e}");
        }

        tracing::info!("Worker pool shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use isbn_sweep::{BODY_SPACE, PartitionSettings, Prefix};
    use serde_json::json;
    use std::{io::Read, path::Path};

    fn directory() -> Arc<Directory> {
        let json = json!({
            "978": {
                "0": {
                    "agency": "English",
                    "allocation_blocks": [{
                        "publisher_range": { "min": "00", "max": "19" },
                        "publication_range": { "min": "000000", "max": "999999" },
                        "is_unallocated": false,
                    }]
                }
            },
            "979": {
                "": {
                    "agency": "everything",
                    "allocation_blocks": [{
                        "publisher_range": { "min": "00", "max": "99" },
                        "publication_range": { "min": null, "max": null },
                        "is_unallocated": false,
                    }]
                }
            }
        });
        Arc::new(Directory::from_json_str(&json.to_string()).unwrap())
    }

    fn config(output_dir: &Path, num_workers: usize) -> RunConfig {
        RunConfig {
            directory: "unused.json".into(),
            output_dir: output_dir.to_path_buf(),
            prefixes: vec![Prefix::BOOKLAND, Prefix::BOOKLAND_EXT],
            space: 3_000,
            num_workers,
            settings: PartitionSettings {
                chunk_size: 100,
                flush_size: 50,
                compression_level: 5,
            },
            only: Vec::new(),
            shutdown_timeout: Duration::from_secs(3),
        }
    }

    fn lines(path: &Path) -> Vec<String> {
        let mut text = String::new();
        GzDecoder::new(std::fs::File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text.lines().map(str::to_owned).collect()
    }

    #[tokio::test]
    async fn runs_every_partition_once() {
        let out = tempfile::tempdir().unwrap();
        let config = config(out.path(), 4);
        let pool = WorkerPool::spawn(&config, directory(), CancellationToken::new()).unwrap();

        let reports = pool.run(config.plan().unwrap()).await;
        pool.shutdown().await;

        assert_eq!(reports.len(), 8);
        assert!(reports.iter().all(PartitionReport::is_complete));

        let mut all = Vec::new();
        for report in &reports {
            let file = out.path().join(report.partition.file_name());
            let got = lines(&file);
            match &report.outcome {
                Outcome::Completed(stats) => assert_eq!(stats.accepted, got.len() as u64),
                other => panic!("unexpected outcome {other:?}"),
            }
            all.extend(got);
        }

        // Every 978 body below 3000 sits in publisher 00; 979 accepts all.
        assert_eq!(all.len(), 6_000);
        let mut deduped = all.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), all.len());
    }

    #[tokio::test]
    async fn round_robin_gives_each_worker_one_partition_per_prefix() {
        let out = tempfile::tempdir().unwrap();
        let config = config(out.path(), 3);
        let pool = WorkerPool::spawn(&config, directory(), CancellationToken::new()).unwrap();

        let reports = pool.run(config.plan().unwrap()).await;
        pool.shutdown().await;

        for report in &reports {
            assert_eq!(report.worker_id, report.partition.index);
        }
    }

    #[tokio::test]
    async fn cancelled_pool_skips_pending_partitions() {
        let out = tempfile::tempdir().unwrap();
        let config = config(out.path(), 2);
        let token = CancellationToken::new();
        token.cancel();
        let pool = WorkerPool::spawn(&config, directory(), token.clone()).unwrap();

        let reports = pool.run(config.plan().unwrap()).await;
        pool.shutdown().await;

        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| matches!(r.outcome, Outcome::Skipped)));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn io_failure_is_isolated_to_its_partition() {
        let out = tempfile::tempdir().unwrap();
        let config = config(out.path(), 2);
        // A directory squatting on one partition's file name makes only that
        // partition fail to open its output.
        std::fs::create_dir(out.path().join("979_1.txt.gz")).unwrap();

        let pool = WorkerPool::spawn(&config, directory(), CancellationToken::new()).unwrap();
        let reports = pool.run(config.plan().unwrap()).await;
        pool.shutdown().await;

        let failed: Vec<_> = reports.iter().filter(|r| !r.is_complete()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].partition.prefix, Prefix::BOOKLAND_EXT);
        assert_eq!(failed[0].partition.index, 1);
        assert!(matches!(
            failed[0].outcome,
            Outcome::Failed(PoolError::Partition(isbn_sweep::Error::PartitionIo { .. }))
        ));
    }

    #[test]
    fn worker_count_is_not_bounded_by_blocking_threads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(1)
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let out = tempfile::tempdir().unwrap();
            let config = config(out.path(), 3);
            let pool = WorkerPool::spawn(&config, directory(), CancellationToken::new()).unwrap();

            let reports = timeout(Duration::from_secs(30), pool.run(config.plan().unwrap()))
                .await
                .expect("pool stalled with more workers than blocking threads");
            pool.shutdown().await;

            assert_eq!(reports.len(), 6);
            assert!(reports.iter().all(PartitionReport::is_complete));
        });
    }

    #[tokio::test]
    async fn malformed_candidate_stops_the_worker() {
        let out = tempfile::tempdir().unwrap();
        let config = config(out.path(), 1);
        let pool = WorkerPool::spawn(&config, directory(), CancellationToken::new()).unwrap();

        let bad = Partition {
            prefix: Prefix::BOOKLAND,
            index: 0,
            start: BODY_SPACE - 1,
            stop: BODY_SPACE + 1,
        };
        let good = Partition {
            prefix: Prefix::BOOKLAND,
            index: 1,
            start: 0,
            stop: 10,
        };
        let reports = pool.run([bad, good]).await;
        pool.shutdown().await;

        assert_eq!(reports.len(), 2);
        assert!(matches!(
            reports[0].outcome,
            Outcome::Failed(PoolError::Partition(isbn_sweep::Error::MalformedCandidate {
                value: BODY_SPACE
            }))
        ));
        assert!(matches!(
            reports[1].outcome,
            Outcome::Failed(PoolError::ChannelError { .. })
        ));
        // Neither partition got as far as opening its output.
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
