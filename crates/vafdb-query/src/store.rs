//! The narrow record-store interface the engine runs against.
//!
//! A store lowers validated clauses through [`PredicateBuilder`] and answers
//! keyset scans over `(created, id)`. Nothing else is required of it: no
//! offsets, no counts, no joins beyond the `metadata` relation a clause's
//! path names.

use crate::compile::PredicateBuilder;
use crate::ordering::{Dir, SeekKey};
use crate::schema::FieldPath;
use crate::value::Value;

/// Read access to a record's filterable fields.
///
/// # Example
///
/// ```
/// use vafdb_query::{FieldAccess, FieldPath, Number, Value};
///
/// struct Row {
///     coverage: i64,
///     sample_id: String,
/// }
///
/// impl FieldAccess for Row {
///     fn field_value(&self, path: &FieldPath) -> Value<'_> {
///         match (path.relation, path.column) {
///             (None, "coverage") => Value::Number(Number::I64(self.coverage)),
///             (Some("metadata"), "sample_id") => Value::Text(&self.sample_id),
///             _ => Value::None,
///         }
///     }
/// }
/// ```
pub trait FieldAccess {
    /// Returns the value at `path`, or [`Value::None`] when the field is
    /// null or unknown.
    fn field_value(&self, path: &FieldPath) -> Value<'_>;
}

/// A stored record's position in the result order.
pub trait Keyed {
    fn seek_key(&self) -> SeekKey;
}

/// Where a scan starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// From the first record, ascending.
    Start,
    /// Strictly after the key, ascending.
    After(SeekKey),
    /// Strictly before the key, descending.
    Before(SeekKey),
}

impl Bound {
    /// The direction rows come back in.
    pub fn dir(self) -> Dir {
        match self {
            Bound::Start | Bound::After(_) => Dir::Asc,
            Bound::Before(_) => Dir::Desc,
        }
    }

    /// Returns `true` if `key` lies past this bound in its scan direction.
    pub fn admits(self, key: &SeekKey) -> bool {
        match self {
            Bound::Start => true,
            Bound::After(after) => *key > after,
            Bound::Before(before) => *key < before,
        }
    }
}

/// A filterable, keyset-scannable record store.
pub trait RecordStore: PredicateBuilder {
    type Record: Keyed;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns at most `limit` records matching `predicate` past `bound`,
    /// in the bound's direction.
    fn scan(
        &self,
        predicate: &Self::Predicate,
        bound: Bound,
        limit: usize,
    ) -> Result<Vec<Self::Record>, Self::Error>;
}
