//! Drives a single partition from enumeration to compressed output.
//!
//! The pipeline is fully sequential: generate a batch, validate it, buffer
//! accepted identifiers, flush when the buffer is full, repeat. Cancellation
//! is polled between batches; a cancelled partition still drains its buffer
//! and closes its gzip stream, so the file on disk is always well-formed.

use crate::{
    DEFAULT_COMPRESSION_LEVEL, Directory, Enumerator, Error, OutputWriter, Partition, Result,
};
use std::{io::Write, path::Path, time::Duration, time::Instant};

/// Batches between progress events.
#[cfg(feature = "tracing")]
const PROGRESS_EVERY: u64 = 100;

/// Per-partition tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionSettings {
    /// Bodies generated per batch.
    pub chunk_size: usize,
    /// Accepted identifiers buffered before a bulk write.
    pub flush_size: usize,
    /// gzip level, 0-9.
    pub compression_level: u32,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1_000_000,
            flush_size: 100_000,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl PartitionSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "chunk size must be greater than 0".into(),
            });
        }
        if self.flush_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "flush size must be greater than 0".into(),
            });
        }
        if self.compression_level > 9 {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "compression level {} is outside 0-9",
                    self.compression_level
                ),
            });
        }
        Ok(())
    }
}

/// Lifecycle of a worker on one partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Done,
}

/// Polled between batches to stop a partition early.
pub trait CancelSignal {
    fn is_cancelled(&self) -> bool;
}

impl<F: Fn() -> bool> CancelSignal for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Outcome of a partition that ran to `Done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionStats {
    pub partition: Partition,
    /// Candidates generated and checked.
    pub scanned: u64,
    /// Candidates written to the output.
    pub accepted: u64,
    pub batches: u64,
    /// `true` if the run stopped before the end of the range.
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Runs `partition` and writes accepted identifiers to `sink` as gzip.
///
/// Returns the statistics and the sink once the gzip stream is closed.
///
/// # Errors
///
/// - [`Error::PartitionIo`] if writing to `sink` fails.
/// - [`Error::MalformedCandidate`] / [`Error::InvalidConfig`] if the
///   partition bounds or chunk size are unusable.
pub fn run_partition<W, C>(
    partition: &Partition,
    directory: &Directory,
    settings: &PartitionSettings,
    sink: W,
    cancel: &C,
) -> Result<(PartitionStats, W)>
where
    W: Write,
    C: CancelSignal + ?Sized,
{
    let enumerator = partition.enumerate(settings.chunk_size)?;
    let writer = OutputWriter::new(sink, settings.compression_level, settings.flush_size);
    drive(partition, directory, enumerator, writer, cancel)
}

/// Runs `partition` into `<output_dir>/<prefix>_<index>.txt.gz`, replacing any
/// existing file.
///
/// Bounds are checked before the file is opened, so a rejected partition
/// leaves an existing file untouched.
pub fn run_partition_to_file<C>(
    partition: &Partition,
    directory: &Directory,
    settings: &PartitionSettings,
    output_dir: &Path,
    cancel: &C,
) -> Result<PartitionStats>
where
    C: CancelSignal + ?Sized,
{
    let enumerator = partition.enumerate(settings.chunk_size)?;
    let path = output_dir.join(partition.file_name());
    let writer = OutputWriter::create(&path, settings.compression_level, settings.flush_size)
        .map_err(|source| io_error(partition, source))?;

    #[cfg(feature = "tracing")]
    tracing::debug!(path = %path.display(), "Opened partition output");

    let (stats, _) = drive(partition, directory, enumerator, writer, cancel)?;
    Ok(stats)
}

fn io_error(partition: &Partition, source: std::io::Error) -> Error {
    Error::PartitionIo {
        prefix: partition.prefix.to_string(),
        index: partition.index,
        source,
    }
}

fn transition(_partition: &Partition, state: &mut WorkerState, next: WorkerState) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        partition = %_partition,
        "Worker state {:?} -> {:?}",
        *state,
        next
    );
    *state = next;
}

fn report_progress(_stats: &PartitionStats, _through: u64) {
    #[cfg(feature = "tracing")]
    {
        if _stats.batches % PROGRESS_EVERY == 0 {
            tracing::debug!(
                partition = %_stats.partition,
                through = _through,
                scanned = _stats.scanned,
                accepted = _stats.accepted,
                "Partition progress"
            );
        }
    }
}

fn drive<W, C>(
    partition: &Partition,
    directory: &Directory,
    mut enumerator: Enumerator,
    mut writer: OutputWriter<W>,
    cancel: &C,
) -> Result<(PartitionStats, W)>
where
    W: Write,
    C: CancelSignal + ?Sized,
{
    let started = Instant::now();
    let mut state = WorkerState::Idle;
    let mut stats = PartitionStats {
        partition: *partition,
        scanned: 0,
        accepted: 0,
        batches: 0,
        cancelled: false,
        elapsed: Duration::ZERO,
    };

    transition(partition, &mut state, WorkerState::Running);

    // Reused across batches; sized for the first (largest) window.
    let mut batch = Vec::with_capacity(enumerator.first_batch_len());
    loop {
        if cancel.is_cancelled() {
            stats.cancelled = enumerator.remaining() > 0;
            break;
        }
        let Some(range) = enumerator.fill_batch(&mut batch) else {
            break;
        };

        for isbn in &batch {
            if directory.is_valid(isbn) {
                writer
                    .push(isbn)
                    .map_err(|source| io_error(partition, source))?;
                stats.accepted += 1;
            }
        }
        stats.scanned += batch.len() as u64;
        stats.batches += 1;
        report_progress(&stats, range.end);
    }

    transition(partition, &mut state, WorkerState::Draining);
    let sink = writer
        .finish()
        .map_err(|source| io_error(partition, source))?;
    transition(partition, &mut state, WorkerState::Done);

    stats.elapsed = started.elapsed();
    Ok((stats, sink))
}
