//! Roll-up of partition reports into the run's final verdict.

use super::pool::{Outcome, PartitionReport};
use core::{fmt, time::Duration};
use isbn_sweep::Partition;

/// Totals across every partition of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: usize,
    /// Partitions that stopped early and hold partial output.
    pub incomplete: Vec<Partition>,
    /// Partitions never started because the run was cancelled.
    pub skipped: Vec<Partition>,
    pub failed: Vec<Partition>,
    pub scanned: u64,
    pub accepted: u64,
    /// Longest single partition.
    pub slowest: Duration,
}

impl RunSummary {
    pub fn from_reports(reports: &[PartitionReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            match &report.outcome {
                Outcome::Completed(stats) => {
                    summary.scanned += stats.scanned;
                    summary.accepted += stats.accepted;
                    summary.slowest = summary.slowest.max(stats.elapsed);
                    if stats.cancelled {
                        summary.incomplete.push(report.partition);
                    } else {
                        summary.completed += 1;
                    }
                }
                Outcome::Skipped => summary.skipped.push(report.partition),
                Outcome::Failed(e) => {
                    tracing::debug!(
                        "Partition {} on worker {} failed: {e}",
                        report.partition,
                        report.worker_id
                    );
                    summary.failed.push(report.partition);
                }
            }
        }
        summary
    }

    /// `true` when every partition produced complete output.
    pub fn is_success(&self) -> bool {
        self.incomplete.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }

    /// Partitions that need a re-run, formatted for `--only`.
    pub fn rerun_hint(&self) -> Option<String> {
        let mut pending: Vec<&Partition> = self
            .failed
            .iter()
            .chain(&self.incomplete)
            .chain(&self.skipped)
            .collect();
        if pending.is_empty() {
            return None;
        }
        pending.sort_by_key(|p| (p.prefix, p.index));
        let hint = pending
            .iter()
            .map(|p| format!("{}:{}", p.prefix, p.index))
            .collect::<Vec<_>>()
            .join(",");
        Some(hint)
    }

    pub fn log(&self) {
        tracing::info!(
            completed = self.completed,
            incomplete = self.incomplete.len(),
            skipped = self.skipped.len(),
            failed = self.failed.len(),
            scanned = self.scanned,
            accepted = self.accepted,
            slowest_ms = self.slowest.as_millis() as u64,
            "Run finished"
        );
        if let Some(hint) = self.rerun_hint() {
            tracing::warn!("Re-run the unfinished partitions with --only {hint}");
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed, {} incomplete, {} skipped, {} failed",
            self.completed,
            self.incomplete.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::pool::PoolError;
    use isbn_sweep::{PartitionStats, Prefix};

    fn partition(prefix: Prefix, index: usize) -> Partition {
        Partition {
            prefix,
            index,
            start: 0,
            stop: 10,
        }
    }

    fn completed(p: Partition, accepted: u64, cancelled: bool, ms: u64) -> PartitionReport {
        PartitionReport {
            worker_id: p.index,
            partition: p,
            outcome: Outcome::Completed(PartitionStats {
                partition: p,
                scanned: 10,
                accepted,
                batches: 1,
                cancelled,
                elapsed: Duration::from_millis(ms),
            }),
        }
    }

    #[test]
    fn all_complete_is_success() {
        let reports = [
            completed(partition(Prefix::BOOKLAND, 0), 3, false, 5),
            completed(partition(Prefix::BOOKLAND, 1), 4, false, 9),
        ];
        let summary = RunSummary::from_reports(&reports);
        assert!(summary.is_success());
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.scanned, 20);
        assert_eq!(summary.accepted, 7);
        assert_eq!(summary.slowest, Duration::from_millis(9));
        assert_eq!(summary.rerun_hint(), None);
        assert_eq!(summary.to_string(), "2 completed, 0 incomplete, 0 skipped, 0 failed");
    }

    #[test]
    fn unfinished_partitions_are_listed_for_rerun() {
        let reports = [
            completed(partition(Prefix::BOOKLAND_EXT, 1), 3, true, 5),
            PartitionReport {
                worker_id: 0,
                partition: partition(Prefix::BOOKLAND_EXT, 0),
                outcome: Outcome::Skipped,
            },
            PartitionReport {
                worker_id: 3,
                partition: partition(Prefix::BOOKLAND, 3),
                outcome: Outcome::Failed(PoolError::ChannelError {
                    context: "closed".into(),
                }),
            },
            completed(partition(Prefix::BOOKLAND, 0), 1, false, 1),
        ];
        let summary = RunSummary::from_reports(&reports);
        assert!(!summary.is_success());
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.incomplete.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        // Partial output still counts toward the totals.
        assert_eq!(summary.accepted, 4);
        assert_eq!(summary.rerun_hint().as_deref(), Some("978:3,979:0,979:1"));
    }
}
