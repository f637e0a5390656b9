//! Serde model of the directory JSON produced by the range-message converter.
//!
//! ```json
//! {
//!   "978": {
//!     "0": {
//!       "agency": "English language",
//!       "allocation_blocks": [
//!         {
//!           "publisher_range": { "min": "00", "max": "19" },
//!           "publication_range": { "min": "000000", "max": "999999" },
//!           "is_unallocated": false
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Object key order is kept, so registration groups of equal code length are
//! tried in the order the file lists them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `prefix -> group code -> group`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDirectory(pub IndexMap<String, IndexMap<String, RawGroup>>);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroup {
    pub agency: String,
    pub allocation_blocks: Vec<RawBlock>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub publisher_range: RawRange,
    pub publication_range: RawRange,
    pub is_unallocated: bool,
}

/// Fixed-width digit bounds. Either side may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    pub min: Option<String>,
    pub max: Option<String>,
}
