//! Validated filter leaves.
//!
//! A [`Clause`] is a leaf whose field resolved in the schema registry, whose
//! lookup is legal for that field, and whose raw value was coerced into a
//! typed [`ClauseValue`].

use std::cmp::Ordering;
use std::fmt;

use chrono::Datelike;
use regex::Regex;

use crate::lookup::{Cmp, DatePart, Lookup};
use crate::schema::{FieldKind, FieldPath};
use crate::value::{Number, Scalar, Value};

/// A validated filter predicate on one field.
///
/// # Example
///
/// ```
/// use vafdb_query::{Clause, ClauseValue, FieldKind, FieldPath, Lookup, Number, Scalar, Value};
///
/// let clause = Clause {
///     path: FieldPath { relation: None, column: "coverage" },
///     kind: FieldKind::Number,
///     lookup: Lookup::Gte,
///     value: ClauseValue::Scalar(Scalar::Number(Number::I64(20))),
/// };
/// assert!(clause.matches(&Value::Number(Number::I64(45))));
/// assert!(!clause.matches(&Value::Number(Number::I64(5))));
/// ```
#[derive(Debug, Clone)]
pub struct Clause {
    /// Where the field lives relative to a record.
    pub path: FieldPath,
    /// The field's declared kind.
    pub kind: FieldKind,
    /// The comparison operator.
    pub lookup: Lookup,
    /// The coerced operand.
    pub value: ClauseValue,
}

impl Clause {
    /// Evaluates this clause against a field value.
    ///
    /// Null fields only ever satisfy `isnull=true`.
    pub fn matches(&self, field: &Value<'_>) -> bool {
        if let ClauseValue::IsNull(expected) = self.value {
            return field.is_none() == expected;
        }
        if field.is_none() {
            return false;
        }

        match (&self.value, self.lookup) {
            (ClauseValue::Pattern(regex), _) => field.as_str().is_some_and(|s| regex.is_match(s)),
            (ClauseValue::Set(set), _) => set
                .iter()
                .any(|item| item.compare_field(field) == Some(Ordering::Equal)),
            (ClauseValue::Range(low, high), _) => {
                let above = low.compare_field(field).is_some_and(|o| o != Ordering::Greater);
                let below = high.compare_field(field).is_some_and(|o| o != Ordering::Less);
                above && below
            }
            (ClauseValue::Scalar(Scalar::Number(n)), Lookup::Part(part, cmp)) => {
                match_date_part(field, part, cmp, *n)
            }
            (ClauseValue::Scalar(Scalar::Text(pattern)), lookup) if is_text_match(lookup) => {
                field.as_str().is_some_and(|s| match_text(lookup, s, pattern))
            }
            (ClauseValue::Scalar(scalar), lookup) => match (lookup.as_cmp(), scalar.compare_field(field)) {
                (Some(cmp), Some(ordering)) => cmp.eval_ordering(ordering),
                _ => false,
            },
            _ => false,
        }
    }
}

fn is_text_match(lookup: Lookup) -> bool {
    matches!(
        lookup,
        Lookup::IExact
            | Lookup::Contains
            | Lookup::IContains
            | Lookup::StartsWith
            | Lookup::IStartsWith
            | Lookup::EndsWith
            | Lookup::IEndsWith
    )
}

/// Text matching. Case-insensitive patterns arrive lowercased.
fn match_text(lookup: Lookup, field: &str, pattern: &str) -> bool {
    let folded;
    let field = if lookup.is_case_insensitive() {
        folded = field.to_lowercase();
        folded.as_str()
    } else {
        field
    };

    match lookup {
        Lookup::IExact => field == pattern,
        Lookup::Contains | Lookup::IContains => field.contains(pattern),
        Lookup::StartsWith | Lookup::IStartsWith => field.starts_with(pattern),
        Lookup::EndsWith | Lookup::IEndsWith => field.ends_with(pattern),
        _ => false,
    }
}

fn match_date_part(field: &Value<'_>, part: DatePart, cmp: Cmp, operand: Number) -> bool {
    let Some(date) = field.as_date() else {
        return false;
    };
    let component = match part {
        DatePart::Year => date.year() as i64,
        DatePart::Month => date.month() as i64,
        DatePart::Day => date.day() as i64,
    };
    Number::I64(component)
        .compare(operand)
        .is_some_and(|ordering| cmp.eval_ordering(ordering))
}

/// Owned, coerced operand of a clause.
#[derive(Debug, Clone)]
pub enum ClauseValue {
    /// Single operand (`exact`, `lt`, `contains`, date parts, ...).
    Scalar(Scalar),
    /// Membership set (`in`).
    Set(Vec<Scalar>),
    /// Inclusive bounds, low <= high (`range`).
    Range(Scalar, Scalar),
    /// Compiled regular expression (`regex`, `iregex`).
    Pattern(Regex),
    /// `isnull` flag.
    IsNull(bool),
}

impl PartialEq for ClauseValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ClauseValue::Scalar(a), ClauseValue::Scalar(b)) => a == b,
            (ClauseValue::Set(a), ClauseValue::Set(b)) => a == b,
            (ClauseValue::Range(a1, a2), ClauseValue::Range(b1, b2)) => a1 == b1 && a2 == b2,
            (ClauseValue::Pattern(a), ClauseValue::Pattern(b)) => a.as_str() == b.as_str(),
            (ClauseValue::IsNull(a), ClauseValue::IsNull(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ClauseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseValue::Scalar(s) => write!(f, "{s}"),
            ClauseValue::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ClauseValue::Range(low, high) => write!(f, "[{low}..{high}]"),
            ClauseValue::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            ClauseValue::IsNull(flag) => write!(f, "{flag}"),
        }
    }
}

/// Canonical rendering, used for query fingerprints.
impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}={}", self.path, self.lookup, self.value)
    }
}
