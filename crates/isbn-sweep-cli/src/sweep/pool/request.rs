use isbn_sweep::{Partition, PartitionStats};
use tokio::sync::oneshot;

/// A message sent from the pool to an individual worker.
#[derive(Debug)]
pub enum WorkRequest {
    /// Generate `partition` and report on `response`.
    Partition {
        partition: Partition,
        response: oneshot::Sender<PartitionReport>,
    },

    /// Request the worker to stop after acknowledging on `response`.
    Shutdown { response: oneshot::Sender<()> },
}

/// Failures observed by the pool rather than by the partition pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// The partition pipeline itself failed.
    #[error(transparent)]
    Partition(#[from] isbn_sweep::Error),

    /// A worker queue or reply channel closed unexpectedly.
    #[error("Channel error: {context}")]
    ChannelError { context: String },
}

#[derive(Debug)]
pub enum Outcome {
    /// The pipeline reached `Done`. `stats.cancelled` tells whether the range
    /// was fully covered.
    Completed(PartitionStats),
    /// Cancellation arrived before the worker picked the partition up. No
    /// file was touched.
    Skipped,
    Failed(PoolError),
}

impl Outcome {
    /// A malformed candidate means the enumeration arithmetic is broken; the
    /// worker stops instead of taking more work.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::Failed(PoolError::Partition(
                isbn_sweep::Error::MalformedCandidate { .. }
            ))
        )
    }
}

/// What a worker sends back for one partition.
#[derive(Debug)]
pub struct PartitionReport {
    pub worker_id: usize,
    pub partition: Partition,
    pub outcome: Outcome,
}

impl PartitionReport {
    /// `true` if the partition's output is complete and need not be re-run.
    pub fn is_complete(&self) -> bool {
        matches!(&self.outcome, Outcome::Completed(stats) if !stats.cancelled)
    }
}
