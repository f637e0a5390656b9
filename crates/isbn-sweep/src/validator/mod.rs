//! Range matching of candidate bases against a [`Directory`].
//!
//! Matching walks the prefix's groups longest code first and commits to the
//! first group whose code starts the body. If none of that group's blocks
//! accept, the candidate is rejected; shorter codes are never consulted.

#[cfg(test)]
mod tests;

use crate::{
    AllocationBlock, BASE_LEN, Directory, Isbn13, PREFIX_LEN, RegistrationGroup,
};

/// Returns `true` if `base` (prefix + 9-digit body) falls inside an allocated
/// block of `directory`.
#[inline]
pub fn is_valid(base: &[u8; BASE_LEN], directory: &Directory) -> bool {
    let (prefix, body) = base.split_at(PREFIX_LEN);
    let Some(groups) = directory.groups_for(prefix) else {
        return false;
    };

    // First match wins: the groups are sorted so this is the most specific one.
    match groups.iter().find(|group| body.starts_with(&group.code)) {
        Some(group) => group.accepts(&body[group.code.len()..]),
        None => false,
    }
}

impl Directory {
    /// Validates a complete identifier. The check digit is not consulted.
    #[inline]
    pub fn is_valid(&self, isbn: &Isbn13) -> bool {
        is_valid(isbn.base(), self)
    }

    /// Validates a 12-digit base.
    #[inline]
    pub fn is_valid_base(&self, base: &[u8; BASE_LEN]) -> bool {
        is_valid(base, self)
    }
}

impl RegistrationGroup {
    /// Returns `true` if any block accepts the body remainder that follows
    /// this group's code.
    #[inline]
    pub fn accepts(&self, remainder: &[u8]) -> bool {
        self.blocks.iter().any(|block| block.accepts(remainder))
    }
}

impl AllocationBlock {
    /// Splits `remainder` into publisher and publication segments and checks
    /// both against this block's bounds.
    ///
    /// A remainder too short for the publisher segment, or a publication
    /// segment whose width differs from the declared bounds, is rejected.
    #[inline]
    pub fn accepts(&self, remainder: &[u8]) -> bool {
        let Some((publisher, publication)) = remainder.split_at_checked(self.publisher_len())
        else {
            return false;
        };

        if publisher < &*self.publisher_min || publisher > &*self.publisher_max {
            return false;
        }

        match &self.publication {
            None => true,
            Some(range) => {
                publication.len() == range.len()
                    && publication >= &*range.min
                    && publication <= &*range.max
            }
        }
    }
}
