//! Splitting the body space into disjoint per-worker ranges.

use crate::{BODY_SPACE, Enumerator, Error, Prefix, Result};
use core::{fmt, ops::Range};

/// File extension of every partition output.
pub const OUTPUT_EXTENSION: &str = "txt.gz";

/// Splits `[0, space)` into `workers` contiguous half-open ranges.
///
/// Every range but the last has `space / workers` bodies; the last one also
/// absorbs the remainder. When `workers > space` the leading ranges are empty.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `workers` is zero or `space` exceeds
/// [`BODY_SPACE`].
pub fn split_space(space: u64, workers: usize) -> Result<Vec<Range<u64>>> {
    if workers == 0 {
        return Err(Error::InvalidConfig {
            reason: "worker count must be greater than 0".into(),
        });
    }
    if space > BODY_SPACE {
        return Err(Error::InvalidConfig {
            reason: format!("body space {space} exceeds {BODY_SPACE}"),
        });
    }

    let n = workers as u64;
    let step = space / n;
    Ok((0..n)
        .map(|i| {
            let start = i * step;
            let stop = if i + 1 < n { start + step } else { space };
            start..stop
        })
        .collect())
}

/// A body range under one prefix, owned by exactly one worker for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    pub prefix: Prefix,
    /// Position among the prefix's partitions. Part of the output file name.
    pub index: usize,
    pub start: u64,
    pub stop: u64,
}

impl Partition {
    pub const fn len(&self) -> u64 {
        self.stop - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// `<prefix>_<index>.txt.gz`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{OUTPUT_EXTENSION}", self.prefix, self.index)
    }

    /// Candidate batches for this partition.
    pub fn enumerate(&self, chunk_size: usize) -> Result<Enumerator> {
        Enumerator::new(self.prefix, self.start, self.stop, chunk_size)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{} [{}, {})",
            self.prefix, self.index, self.start, self.stop
        )
    }
}

/// Every `(prefix, partition)` task of a run, prefixes in the order given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionPlan {
    partitions: Vec<Partition>,
}

impl PartitionPlan {
    /// Builds `workers` partitions of `[0, space)` for each prefix.
    pub fn new(prefixes: &[Prefix], space: u64, workers: usize) -> Result<Self> {
        let ranges = split_space(space, workers)?;
        let partitions = prefixes
            .iter()
            .flat_map(|&prefix| {
                ranges.iter().enumerate().map(move |(index, range)| Partition {
                    prefix,
                    index,
                    start: range.start,
                    stop: range.end,
                })
            })
            .collect();
        Ok(Self { partitions })
    }

    /// Keeps only the listed `(prefix, index)` pairs. Bounds are unchanged,
    /// so a re-run reproduces the earlier output exactly.
    #[must_use]
    pub fn only(mut self, selected: &[(Prefix, usize)]) -> Self {
        self.partitions.retain(|p| {
            selected
                .iter()
                .any(|&(prefix, index)| p.prefix == prefix && p.index == index)
        });
        self
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total bodies across all partitions.
    pub fn total_candidates(&self) -> u64 {
        self.partitions.iter().map(Partition::len).sum()
    }
}

impl IntoIterator for PartitionPlan {
    type Item = Partition;
    type IntoIter = std::vec::IntoIter<Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.into_iter()
    }
}
