//! Error types for directory loading and partition generation.
//!
//! Every fallible operation in this crate returns [`Error`]. The variants map
//! onto the three failure classes of a run:
//!
//! - Directory failures (`DirectoryLoad`, `DirectoryParse`,
//!   `DirectoryInvalid`) are fatal to the whole run. No partition should start
//!   once one of these is observed.
//! - `PartitionIo` is fatal to a single partition only and carries the
//!   partition's prefix and index so that it can be re-run in isolation.
//! - `MalformedCandidate` signals a body number outside the 9-digit space.
//!   It cannot happen for bounds produced by [`crate::PartitionPlan`] and is
//!   treated as a defect.

use std::{io, path::PathBuf};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for ISBN enumeration.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The directory file could not be opened or read.
    #[error("failed to read directory {path:?}: {source}")]
    DirectoryLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The directory is not well-formed JSON of the expected shape.
    #[error("failed to parse directory: {0}")]
    DirectoryParse(#[from] serde_json::Error),

    /// The directory parsed but violates a structural rule.
    #[error("invalid directory: {reason}")]
    DirectoryInvalid { reason: String },

    /// A partition's output sink could not be opened, written or finished.
    #[error("partition {prefix}_{index}: {source}")]
    PartitionIo {
        prefix: String,
        index: usize,
        #[source]
        source: io::Error,
    },

    /// A body number does not fit in nine digits.
    #[error("malformed candidate body: {value}")]
    MalformedCandidate { value: u64 },

    /// A tuning value was rejected.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Prefix text that is not exactly three ASCII digits.
    #[error("invalid prefix: {value:?}")]
    InvalidPrefix { value: String },

    /// Identifier text that is not exactly thirteen ASCII digits.
    #[error("invalid isbn: {value:?}")]
    InvalidIsbn { value: String },
}

impl Error {
    /// Returns `true` for errors that must stop the entire run rather than a
    /// single partition.
    pub const fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::DirectoryLoad { .. }
                | Self::DirectoryParse(_)
                | Self::DirectoryInvalid { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidPrefix { .. }
        )
    }
}
