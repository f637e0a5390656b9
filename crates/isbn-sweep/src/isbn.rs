use crate::{Error, checksum};
use core::{fmt, str::FromStr};

/// Width of the leading EAN prefix (`978` / `979`).
pub const PREFIX_LEN: usize = 3;
/// Width of the enumerated body that follows the prefix.
pub const BODY_LEN: usize = 9;
/// Width of the prefix plus body, i.e. everything the check digit covers.
pub const BASE_LEN: usize = PREFIX_LEN + BODY_LEN;
/// Width of a complete ISBN-13.
pub const ISBN_LEN: usize = BASE_LEN + 1;
/// Number of distinct 9-digit bodies under one prefix.
pub const BODY_SPACE: u64 = 1_000_000_000;

/// A three-digit EAN prefix such as `978`.
///
/// Only ASCII digits can be stored, which is what makes [`Prefix::as_str`]
/// infallible.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix([u8; PREFIX_LEN]);

impl Prefix {
    /// The bookland prefix.
    pub const BOOKLAND: Self = Self(*b"978");
    /// The newer bookland prefix.
    pub const BOOKLAND_EXT: Self = Self(*b"979");

    /// Builds a prefix from raw bytes, returning `None` unless all three are
    /// ASCII digits.
    pub fn from_ascii(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; PREFIX_LEN] = bytes.try_into().ok()?;
        raw.iter().all(u8::is_ascii_digit).then_some(Self(raw))
    }

    pub const fn as_bytes(&self) -> &[u8; PREFIX_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: every constructor checks that the bytes are ASCII digits.
        unsafe { core::str::from_utf8_unchecked(&self.0) }
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ascii(s.trim().as_bytes()).ok_or_else(|| Error::InvalidPrefix {
            value: s.to_owned(),
        })
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({})", self.as_str())
    }
}

/// A complete 13-digit identifier stored as ASCII bytes.
///
/// Values are produced by [`Isbn13::from_base`], which appends the check
/// digit, so every `Isbn13` built by this crate is checksum-correct. Values
/// parsed with [`Isbn13::from_ascii`] are only checked for shape. Either way
/// the bytes are always ASCII digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Isbn13([u8; ISBN_LEN]);

impl Isbn13 {
    /// Appends the check digit to a 12-digit base. Returns `None` unless every
    /// byte of `base` is an ASCII digit.
    #[inline]
    pub fn from_base(base: &[u8; BASE_LEN]) -> Option<Self> {
        base.iter()
            .all(u8::is_ascii_digit)
            .then(|| Self::from_digits(base))
    }

    /// [`Isbn13::from_base`] for bases the caller built from digits.
    #[inline]
    pub(crate) fn from_digits(base: &[u8; BASE_LEN]) -> Self {
        debug_assert!(base.iter().all(u8::is_ascii_digit));
        let mut raw = [0_u8; ISBN_LEN];
        raw[..BASE_LEN].copy_from_slice(base);
        raw[BASE_LEN] = b'0' + checksum::check_digit(base);
        Self(raw)
    }

    /// Wraps 13 ASCII digits without recomputing the check digit.
    pub fn from_ascii(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; ISBN_LEN] = bytes.try_into().ok()?;
        raw.iter().all(u8::is_ascii_digit).then_some(Self(raw))
    }

    pub const fn as_bytes(&self) -> &[u8; ISBN_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // SAFETY: both constructors only admit ASCII digits.
        unsafe { core::str::from_utf8_unchecked(&self.0) }
    }

    /// The prefix and body, without the check digit.
    #[inline]
    pub fn base(&self) -> &[u8; BASE_LEN] {
        // SAFETY: `ISBN_LEN > BASE_LEN`, so the first `BASE_LEN` bytes are in
        // bounds and `[u8; N]` has alignment 1.
        unsafe { &*self.0.as_ptr().cast::<[u8; BASE_LEN]>() }
    }

    pub fn prefix(&self) -> Prefix {
        Prefix([self.0[0], self.0[1], self.0[2]])
    }

    /// Numeric value of the trailing check digit.
    pub const fn check_digit(&self) -> u8 {
        self.0[BASE_LEN] - b'0'
    }

    /// Returns `true` if the weighted digit sum over all 13 digits is a
    /// multiple of ten.
    pub fn is_checksum_valid(&self) -> bool {
        checksum::is_checksum_valid(&self.0)
    }
}

impl FromStr for Isbn13 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ascii(s.as_bytes()).ok_or_else(|| Error::InvalidIsbn {
            value: s.to_owned(),
        })
    }
}

impl fmt::Display for Isbn13 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Isbn13 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Isbn13({})", self.as_str())
    }
}
