use super::{
    AllocationBlock, Directory, PublicationRange, RawBlock, RawDirectory, RawRange,
    RegistrationGroup,
};
use crate::{BODY_LEN, Error, Prefix, Result};
use core::cmp::Reverse;

impl Directory {
    /// Builds the lookup form of `raw`.
    ///
    /// Unallocated blocks are dropped and each prefix's groups are sorted by
    /// descending code length. Group codes can be prefixes of one another
    /// (`"0"` and `"00"`), so this ordering is what lets the validator commit
    /// to the first group that matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryInvalid`] when a prefix or group code is not
    /// made of digits, or an allocated block has missing, uneven or inverted
    /// bounds.
    pub fn from_raw(raw: &RawDirectory) -> Result<Self> {
        let mut prefixes = Vec::with_capacity(raw.0.len());

        for (prefix_text, groups) in &raw.0 {
            let prefix = Prefix::from_ascii(prefix_text.as_bytes())
                .ok_or_else(|| invalid(format!("prefix {prefix_text:?} is not three digits")))?;

            let mut optimized = groups
                .iter()
                .map(|(code, group)| {
                    check_code(prefix, code)?;
                    let blocks = group
                        .allocation_blocks
                        .iter()
                        .enumerate()
                        .filter(|(_, block)| !block.is_unallocated)
                        .map(|(i, block)| optimize_block(prefix, code, i, block))
                        .collect::<Result<Vec<_>>>()?;

                    Ok(RegistrationGroup {
                        code: code.as_bytes().into(),
                        agency: group.agency.as_str().into(),
                        blocks: blocks.into_boxed_slice(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            // `sort_by_key` is stable: equal-length codes keep file order.
            optimized.sort_by_key(|group| Reverse(group.code.len()));
            prefixes.push((prefix, optimized.into_boxed_slice()));
        }

        Ok(Self { prefixes })
    }
}

fn invalid(reason: String) -> Error {
    Error::DirectoryInvalid { reason }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn check_code(prefix: Prefix, code: &str) -> Result<()> {
    if !is_digits(code) || code.len() > BODY_LEN {
        return Err(invalid(format!(
            "group code {code:?} under {prefix} is not a digit string of at most {BODY_LEN} digits"
        )));
    }
    Ok(())
}

/// Resolves a range into `(min, max)` digit strings of equal width.
///
/// `Ok(None)` means both ends are absent (or empty).
fn bounds<'a>(
    range: &'a RawRange,
    what: &str,
    at: &dyn Fn() -> String,
) -> Result<Option<(&'a str, &'a str)>> {
    let min = range.min.as_deref().filter(|s| !s.is_empty());
    let max = range.max.as_deref().filter(|s| !s.is_empty());

    match (min, max) {
        (None, None) => Ok(None),
        (Some(min), Some(max)) => {
            if !is_digits(min) || !is_digits(max) {
                return Err(invalid(format!("{}: {what} bounds must be digits", at())));
            }
            if min.len() != max.len() {
                return Err(invalid(format!(
                    "{}: {what} bounds {min:?}..{max:?} differ in width",
                    at()
                )));
            }
            if min > max {
                return Err(invalid(format!(
                    "{}: {what} min {min:?} exceeds max {max:?}",
                    at()
                )));
            }
            Ok(Some((min, max)))
        }
        _ => Err(invalid(format!("{}: {what} range is one-sided", at()))),
    }
}

fn optimize_block(
    prefix: Prefix,
    code: &str,
    index: usize,
    block: &RawBlock,
) -> Result<AllocationBlock> {
    let at = || format!("{prefix}-{code} block {index}");

    let (publisher_min, publisher_max) = bounds(&block.publisher_range, "publisher", &at)?
        .ok_or_else(|| invalid(format!("{}: allocated block has no publisher range", at())))?;

    let publication =
        bounds(&block.publication_range, "publication", &at)?.map(|(min, max)| PublicationRange {
            min: min.as_bytes().into(),
            max: max.as_bytes().into(),
        });

    Ok(AllocationBlock {
        publisher_min: publisher_min.as_bytes().into(),
        publisher_max: publisher_max.as_bytes().into(),
        publication,
    })
}
