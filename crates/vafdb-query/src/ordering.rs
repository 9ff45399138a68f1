//! Result ordering.
//!
//! Records are totally ordered by [`SeekKey`] `(created, id)`. Pagination
//! walks that order in a [`Dir`]: forward pages ascend, `previous` pages
//! scan descending and are flipped back before being returned.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    /// Ascending order (oldest first).
    #[default]
    Asc,
    /// Descending order (newest first).
    Desc,
}

impl Dir {
    pub fn is_asc(self) -> bool {
        matches!(self, Dir::Asc)
    }

    pub fn is_desc(self) -> bool {
        matches!(self, Dir::Desc)
    }

    /// For `Asc`, returns the ordering unchanged. For `Desc`, reverses it.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    pub fn reverse(self) -> Dir {
        match self {
            Dir::Asc => Dir::Desc,
            Dir::Desc => Dir::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a record in the total result order.
///
/// `created` orders records; `id` breaks ties between records created in
/// the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeekKey {
    pub created: DateTime<Utc>,
    pub id: u64,
}

impl SeekKey {
    pub fn new(created: DateTime<Utc>, id: u64) -> Self {
        SeekKey { created, id }
    }

    /// Compares two keys in scan direction `dir`.
    pub fn cmp_in(&self, other: &SeekKey, dir: Dir) -> Ordering {
        dir.apply(self.cmp(other))
    }
}
