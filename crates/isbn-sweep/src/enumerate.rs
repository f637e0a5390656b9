//! Ordered generation of candidate identifiers for a body range.
//!
//! An [`Enumerator`] walks `[start, stop)` in windows of `chunk_size` bodies.
//! Each body is zero-padded to nine digits, appended to the prefix and
//! completed with its check digit. Any sub-window can be regenerated on its
//! own from the same bounds.

use crate::{BASE_LEN, BODY_LEN, BODY_SPACE, Error, Isbn13, PREFIX_LEN, Prefix, Result};
use core::{iter::FusedIterator, ops::Range};

/// Renders `n` as a nine-digit, zero-padded ASCII body.
///
/// # Errors
///
/// Returns [`Error::MalformedCandidate`] if `n` does not fit in nine digits.
pub fn render_body(n: u64) -> Result<[u8; BODY_LEN]> {
    if n >= BODY_SPACE {
        return Err(Error::MalformedCandidate { value: n });
    }
    let mut body = [b'0'; BODY_LEN];
    write_digits(n, &mut body);
    Ok(body)
}

/// Writes `n` right-aligned into `out`, truncating high digits that do not
/// fit.
#[inline]
fn write_digits(mut n: u64, out: &mut [u8]) {
    for slot in out.iter_mut().rev() {
        *slot = b'0' + (n % 10) as u8;
        n /= 10;
    }
}

/// Adds one to an ASCII decimal counter in place, wrapping at all nines.
#[inline]
fn increment(digits: &mut [u8]) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
}

/// One window of generated identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateBatch {
    /// Body numbers covered by this batch.
    pub range: Range<u64>,
    /// One identifier per body, in ascending order.
    pub isbns: Vec<Isbn13>,
}

/// Finite, ordered producer of [`CandidateBatch`]es.
#[derive(Clone, Debug)]
pub struct Enumerator {
    prefix: Prefix,
    next: u64,
    stop: u64,
    chunk_size: usize,
}

/// Shorthand for [`Enumerator::new`].
pub fn enumerate(prefix: Prefix, start: u64, stop: u64, chunk_size: usize) -> Result<Enumerator> {
    Enumerator::new(prefix, start, stop, chunk_size)
}

impl Enumerator {
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `chunk_size` is zero or `start > stop`.
    /// - [`Error::MalformedCandidate`] if `stop` reaches past the 9-digit
    ///   body space.
    pub fn new(prefix: Prefix, start: u64, stop: u64, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "chunk size must be greater than 0".into(),
            });
        }
        if start > stop {
            return Err(Error::InvalidConfig {
                reason: format!("range start {start} is past stop {stop}"),
            });
        }
        if stop > BODY_SPACE {
            return Err(Error::MalformedCandidate { value: stop - 1 });
        }
        Ok(Self {
            prefix,
            next: start,
            stop,
            chunk_size,
        })
    }

    pub const fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// Bodies not yet produced.
    pub const fn remaining(&self) -> u64 {
        self.stop - self.next
    }

    /// Batches not yet produced.
    pub const fn remaining_batches(&self) -> u64 {
        self.remaining().div_ceil(self.chunk_size as u64)
    }

    /// Length of the next window, which is also the largest one left.
    pub fn first_batch_len(&self) -> usize {
        usize::try_from(self.remaining())
            .unwrap_or(usize::MAX)
            .min(self.chunk_size)
    }

    /// Writes the next window into `out`, replacing its contents, and returns
    /// the body range it covers. Returns `None` once the range is exhausted.
    ///
    /// Reusing `out` across calls avoids one allocation per batch.
    pub fn fill_batch(&mut self, out: &mut Vec<Isbn13>) -> Option<Range<u64>> {
        if self.next >= self.stop {
            return None;
        }
        let chunk_start = self.next;
        let chunk_end = self.stop.min(chunk_start.saturating_add(self.chunk_size as u64));

        out.clear();
        out.reserve((chunk_end - chunk_start) as usize);

        let mut base = [0_u8; BASE_LEN];
        base[..PREFIX_LEN].copy_from_slice(self.prefix.as_bytes());
        // `new` guarantees `stop <= BODY_SPACE`, so every body here fits.
        write_digits(chunk_start, &mut base[PREFIX_LEN..]);

        for _ in chunk_start..chunk_end {
            out.push(Isbn13::from_digits(&base));
            increment(&mut base[PREFIX_LEN..]);
        }

        self.next = chunk_end;
        Some(chunk_start..chunk_end)
    }
}

impl Iterator for Enumerator {
    type Item = CandidateBatch;

    fn next(&mut self) -> Option<Self::Item> {
        let mut isbns = Vec::new();
        let range = self.fill_batch(&mut isbns)?;
        Some(CandidateBatch { range, isbns })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining_batches()).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl FusedIterator for Enumerator {}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(e: Enumerator) -> Vec<Isbn13> {
        e.flat_map(|batch| batch.isbns).collect()
    }

    #[test]
    fn renders_zero_padded_bodies() {
        assert_eq!(&render_body(0).unwrap(), b"000000000");
        assert_eq!(&render_body(30_640_615).unwrap(), b"030640615");
        assert_eq!(&render_body(999_999_999).unwrap(), b"999999999");
        assert!(matches!(
            render_body(BODY_SPACE),
            Err(Error::MalformedCandidate { value: BODY_SPACE })
        ));
    }

    #[test]
    fn increment_carries() {
        let mut d = *b"000000199";
        increment(&mut d);
        assert_eq!(&d, b"000000200");
        let mut d = *b"999999999";
        increment(&mut d);
        assert_eq!(&d, b"000000000");
    }

    #[test]
    fn produces_checksummed_identifiers_in_order() {
        let isbns = flatten(enumerate(Prefix::BOOKLAND, 30_640_610, 30_640_620, 4).unwrap());
        assert_eq!(isbns.len(), 10);
        assert_eq!(isbns[5].as_str(), "9780306406157");
        assert!(isbns.iter().all(Isbn13::is_checksum_valid));
        assert!(isbns.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn windows_cover_range_with_short_tail() {
        let batches: Vec<_> = enumerate(Prefix::BOOKLAND_EXT, 5, 30, 10)
            .unwrap()
            .map(|b| (b.range, b.isbns.len()))
            .collect();
        assert_eq!(batches, [(5..15, 10), (15..25, 10), (25..30, 5)]);
    }

    #[test]
    fn chunk_size_does_not_change_output() {
        let small = flatten(enumerate(Prefix::BOOKLAND, 99_990, 102_345, 10).unwrap());
        let large = flatten(enumerate(Prefix::BOOKLAND, 99_990, 102_345, 1000).unwrap());
        let whole = flatten(enumerate(Prefix::BOOKLAND, 99_990, 102_345, 1_000_000).unwrap());
        assert_eq!(small, large);
        assert_eq!(small, whole);
        assert_eq!(small.len(), 102_345 - 99_990);
    }

    #[test]
    fn sub_windows_regenerate_independently() {
        let whole = flatten(enumerate(Prefix::BOOKLAND, 0, 5000, 333).unwrap());
        let mut pieces = flatten(enumerate(Prefix::BOOKLAND, 0, 1234, 333).unwrap());
        pieces.extend(flatten(enumerate(Prefix::BOOKLAND, 1234, 5000, 77).unwrap()));
        assert_eq!(whole, pieces);
    }

    #[test]
    fn top_of_space_is_reachable() {
        let isbns = flatten(enumerate(Prefix::BOOKLAND_EXT, BODY_SPACE - 3, BODY_SPACE, 2).unwrap());
        let last = isbns.last().unwrap();
        assert_eq!(&last.as_str()[..12], "979999999999");
        assert_eq!(isbns.len(), 3);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let mut e = enumerate(Prefix::BOOKLAND, 42, 42, 10).unwrap();
        assert_eq!(e.remaining_batches(), 0);
        assert!(e.next().is_none());
        assert!(e.next().is_none());
    }

    #[test]
    fn reports_remaining_batches() {
        let mut e = enumerate(Prefix::BOOKLAND, 0, 25, 10).unwrap();
        assert_eq!(e.size_hint(), (3, Some(3)));
        let mut buf = Vec::new();
        assert_eq!(e.fill_batch(&mut buf), Some(0..10));
        assert_eq!(e.remaining(), 15);
        assert_eq!(e.remaining_batches(), 2);
    }

    #[test]
    fn first_batch_len_is_capped_by_range() {
        assert_eq!(enumerate(Prefix::BOOKLAND, 0, 25, 10).unwrap().first_batch_len(), 10);
        assert_eq!(enumerate(Prefix::BOOKLAND, 0, 7, 10).unwrap().first_batch_len(), 7);
        assert_eq!(enumerate(Prefix::BOOKLAND, 3, 3, 10).unwrap().first_batch_len(), 0);
    }

    #[test]
    fn rejects_bad_bounds() {
        assert!(matches!(
            enumerate(Prefix::BOOKLAND, 0, 10, 0),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            enumerate(Prefix::BOOKLAND, 11, 10, 5),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            enumerate(Prefix::BOOKLAND, 0, BODY_SPACE + 1, 5),
            Err(Error::MalformedCandidate { .. })
        ));
    }
}
