//! Weighted modulo-10 check digit.
//!
//! Digits are weighted `1, 3, 1, 3, ...` from the left. The check digit is the
//! value that brings the weighted sum of all 13 digits to a multiple of ten.

use crate::isbn::{BASE_LEN, ISBN_LEN};

/// Weight of the digit at `position` (0-based, from the left).
#[inline(always)]
#[allow(clippy::inline_always)]
pub const fn weight(position: usize) -> u32 {
    if position % 2 == 0 { 1 } else { 3 }
}

/// Weighted sum of ASCII digits whose first byte sits at `offset` within the
/// full identifier.
///
/// Non-digit bytes produce a meaningless sum, never a panic.
#[inline]
pub(crate) fn weighted_sum(digits: &[u8], offset: usize) -> u32 {
    digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d.wrapping_sub(b'0')) * weight(offset + i))
        .sum()
}

/// Turns a weighted sum into the digit that completes it.
#[inline(always)]
#[allow(clippy::inline_always)]
pub const fn complete(sum: u32) -> u8 {
    ((10 - (sum % 10)) % 10) as u8
}

/// Check digit (0-9) for a 12-digit ASCII base.
///
/// The base is expected to be ASCII digits. Other bytes yield some digit in
/// `0..10` without panicking.
#[inline]
pub fn check_digit(base: &[u8; BASE_LEN]) -> u8 {
    complete(weighted_sum(base, 0))
}

/// Check digits for a batch of bases, appended to `out` as ASCII.
///
/// Equivalent to calling [`check_digit`] per element.
pub fn check_digits_into(bases: &[[u8; BASE_LEN]], out: &mut Vec<u8>) {
    out.reserve(bases.len());
    out.extend(bases.iter().map(|base| b'0' + check_digit(base)));
}

/// Returns `true` if the weighted sum over all 13 digits is a multiple of ten.
pub fn is_checksum_valid(isbn: &[u8; ISBN_LEN]) -> bool {
    isbn.iter().all(u8::is_ascii_digit) && weighted_sum(isbn, 0) % 10 == 0
}
