//! The registration-group directory in lookup-ready form.
//!
//! A [`Directory`] is built once from a [`RawDirectory`] and never mutated
//! afterwards. Share it between workers behind an `Arc`.

mod optimize;
mod raw;

pub use raw::*;

use crate::{Error, Prefix, Result};
use std::{fs, path::Path};

/// Publication bounds of an [`AllocationBlock`]. Both ends have the same
/// width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicationRange {
    pub(crate) min: Box<[u8]>,
    pub(crate) max: Box<[u8]>,
}

impl PublicationRange {
    pub fn len(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    pub fn min(&self) -> &[u8] {
        &self.min
    }

    pub fn max(&self) -> &[u8] {
        &self.max
    }
}

/// One allocated publisher range inside a registration group.
///
/// Unallocated blocks never reach this type; [`Directory::from_raw`] drops
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationBlock {
    pub(crate) publisher_min: Box<[u8]>,
    pub(crate) publisher_max: Box<[u8]>,
    pub(crate) publication: Option<PublicationRange>,
}

impl AllocationBlock {
    /// Width of the publisher segment.
    pub fn publisher_len(&self) -> usize {
        self.publisher_min.len()
    }

    pub fn publisher_min(&self) -> &[u8] {
        &self.publisher_min
    }

    pub fn publisher_max(&self) -> &[u8] {
        &self.publisher_max
    }

    /// `None` means any publication segment is accepted.
    pub const fn publication(&self) -> Option<&PublicationRange> {
        self.publication.as_ref()
    }

    /// Width of the publication segment, or `0` when unbounded.
    pub fn publication_len(&self) -> usize {
        self.publication.as_ref().map_or(0, PublicationRange::len)
    }
}

/// A registration group: its code and its allocated blocks, in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationGroup {
    pub(crate) code: Box<[u8]>,
    pub(crate) agency: Box<str>,
    pub(crate) blocks: Box<[AllocationBlock]>,
}

impl RegistrationGroup {
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn agency(&self) -> &str {
        &self.agency
    }

    pub fn blocks(&self) -> &[AllocationBlock] {
        &self.blocks
    }
}

/// Immutable, lookup-optimized directory.
///
/// Groups under each prefix are ordered by descending code length so the most
/// specific code is always tried first. Groups of equal length keep their file
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    pub(crate) prefixes: Vec<(Prefix, Box<[RegistrationGroup]>)>,
}

impl Directory {
    /// Reads, parses and optimizes a directory JSON file.
    ///
    /// # Errors
    ///
    /// - [`Error::DirectoryLoad`] if the file cannot be read.
    /// - [`Error::DirectoryParse`] if it is not valid directory JSON.
    /// - [`Error::DirectoryInvalid`] if a structural rule is violated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::DirectoryLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = Self::from_json_str(&text)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            path = %path.display(),
            prefixes = directory.prefixes.len(),
            groups = directory.group_count(),
            blocks = directory.block_count(),
            "Loaded allocation directory"
        );

        Ok(directory)
    }

    /// Parses and optimizes directory JSON held in memory.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawDirectory = serde_json::from_str(json)?;
        Self::from_raw(&raw)
    }

    /// Prefixes present in the directory, in file order.
    pub fn prefixes(&self) -> impl Iterator<Item = Prefix> + '_ {
        self.prefixes.iter().map(|(prefix, _)| *prefix)
    }

    pub fn contains_prefix(&self, prefix: Prefix) -> bool {
        self.groups(prefix).is_some()
    }

    /// Groups registered under `prefix`, longest code first.
    pub fn groups(&self, prefix: Prefix) -> Option<&[RegistrationGroup]> {
        self.groups_for(prefix.as_bytes())
    }

    // A linear scan beats hashing for the two or three prefixes a directory
    // ever carries.
    #[inline]
    pub(crate) fn groups_for(&self, prefix: &[u8]) -> Option<&[RegistrationGroup]> {
        self.prefixes
            .iter()
            .find(|(p, _)| p.as_bytes() == prefix)
            .map(|(_, groups)| &**groups)
    }

    pub fn group_count(&self) -> usize {
        self.prefixes.iter().map(|(_, groups)| groups.len()).sum()
    }

    pub fn block_count(&self) -> usize {
        self.prefixes
            .iter()
            .flat_map(|(_, groups)| groups.iter())
            .map(|group| group.blocks.len())
            .sum()
    }
}
