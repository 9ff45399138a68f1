//! Lookup operators for filter leaves.
//!
//! The [`Lookup`] enum is the closed set of comparison operators a leaf can
//! carry. Wire names follow the `field__lookup` convention (`coverage__gte`,
//! `collection_date__year__lt`).

use std::cmp::Ordering;
use std::fmt;

use crate::schema::FieldKind;

/// Comparison applied to a date component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    Exact,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Cmp {
    pub const ALL: [Cmp; 6] = [Cmp::Exact, Cmp::Ne, Cmp::Lt, Cmp::Lte, Cmp::Gt, Cmp::Gte];

    /// Evaluates the comparison given an ordering result.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Cmp::Exact => ordering == Ordering::Equal,
            Cmp::Ne => ordering != Ordering::Equal,
            Cmp::Gt => ordering == Ordering::Greater,
            Cmp::Gte => ordering != Ordering::Less,
            Cmp::Lt => ordering == Ordering::Less,
            Cmp::Lte => ordering != Ordering::Greater,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cmp::Exact => "exact",
            Cmp::Ne => "ne",
            Cmp::Lt => "lt",
            Cmp::Lte => "lte",
            Cmp::Gt => "gt",
            Cmp::Gte => "gte",
        }
    }

    fn parse(name: &str) -> Option<Cmp> {
        Cmp::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// Component of a date compared by a date-part lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    pub const ALL: [DatePart; 3] = [DatePart::Year, DatePart::Month, DatePart::Day];

    pub fn as_str(self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
        }
    }
}

/// Lookup operator for a filter leaf.
///
/// Operators are grouped by the kinds they support:
/// - **Universal**: `Exact`, `Ne`, `IsNull`
/// - **Ordered** (text, number, date): `Lt`, `Lte`, `Gt`, `Gte`, `Range`
/// - **Text**: `Contains`, `StartsWith`, `EndsWith`, `Regex` and their
///   case-insensitive forms
/// - **Sets**: `In` (everything but booleans)
/// - **Date parts**: `Part(Year|Month|Day, cmp)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Exact,
    IExact,
    Ne,
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    Regex,
    IRegex,
    In,
    Range,
    Lt,
    Lte,
    Gt,
    Gte,
    IsNull,
    Part(DatePart, Cmp),
}

/// Default lookups for text fields.
pub const TEXT_LOOKUPS: &[Lookup] = &[
    Lookup::Exact,
    Lookup::Ne,
    Lookup::In,
    Lookup::Range,
    Lookup::Lt,
    Lookup::Lte,
    Lookup::Gt,
    Lookup::Gte,
    Lookup::IsNull,
    Lookup::IExact,
    Lookup::Contains,
    Lookup::IContains,
    Lookup::StartsWith,
    Lookup::IStartsWith,
    Lookup::EndsWith,
    Lookup::IEndsWith,
    Lookup::Regex,
    Lookup::IRegex,
];

/// Default lookups for number fields.
pub const NUMBER_LOOKUPS: &[Lookup] = &[
    Lookup::Exact,
    Lookup::Ne,
    Lookup::In,
    Lookup::Range,
    Lookup::Lt,
    Lookup::Lte,
    Lookup::Gt,
    Lookup::Gte,
    Lookup::IsNull,
];

/// Default lookups for date fields.
pub const DATE_LOOKUPS: &[Lookup] = &[
    Lookup::Exact,
    Lookup::Ne,
    Lookup::In,
    Lookup::Range,
    Lookup::Lt,
    Lookup::Lte,
    Lookup::Gt,
    Lookup::Gte,
    Lookup::IsNull,
    Lookup::Part(DatePart::Year, Cmp::Exact),
    Lookup::Part(DatePart::Year, Cmp::Ne),
    Lookup::Part(DatePart::Year, Cmp::Lt),
    Lookup::Part(DatePart::Year, Cmp::Lte),
    Lookup::Part(DatePart::Year, Cmp::Gt),
    Lookup::Part(DatePart::Year, Cmp::Gte),
    Lookup::Part(DatePart::Month, Cmp::Exact),
    Lookup::Part(DatePart::Month, Cmp::Ne),
    Lookup::Part(DatePart::Month, Cmp::Lt),
    Lookup::Part(DatePart::Month, Cmp::Lte),
    Lookup::Part(DatePart::Month, Cmp::Gt),
    Lookup::Part(DatePart::Month, Cmp::Gte),
    Lookup::Part(DatePart::Day, Cmp::Exact),
    Lookup::Part(DatePart::Day, Cmp::Ne),
    Lookup::Part(DatePart::Day, Cmp::Lt),
    Lookup::Part(DatePart::Day, Cmp::Lte),
    Lookup::Part(DatePart::Day, Cmp::Gt),
    Lookup::Part(DatePart::Day, Cmp::Gte),
];

/// Default lookups for choice fields.
pub const CHOICE_LOOKUPS: &[Lookup] = &[Lookup::Exact, Lookup::Ne, Lookup::In, Lookup::IsNull];

/// Default lookups for boolean fields.
pub const BOOL_LOOKUPS: &[Lookup] = &[Lookup::Exact, Lookup::Ne, Lookup::IsNull];

impl Lookup {
    /// Parses a wire name such as `gte` or `year__lt`.
    pub fn parse(name: &str) -> Option<Lookup> {
        let simple = match name {
            "exact" => Some(Lookup::Exact),
            "iexact" => Some(Lookup::IExact),
            "ne" => Some(Lookup::Ne),
            "contains" => Some(Lookup::Contains),
            "icontains" => Some(Lookup::IContains),
            "startswith" => Some(Lookup::StartsWith),
            "istartswith" => Some(Lookup::IStartsWith),
            "endswith" => Some(Lookup::EndsWith),
            "iendswith" => Some(Lookup::IEndsWith),
            "regex" => Some(Lookup::Regex),
            "iregex" => Some(Lookup::IRegex),
            "in" => Some(Lookup::In),
            "range" => Some(Lookup::Range),
            "lt" => Some(Lookup::Lt),
            "lte" => Some(Lookup::Lte),
            "gt" => Some(Lookup::Gt),
            "gte" => Some(Lookup::Gte),
            "isnull" => Some(Lookup::IsNull),
            _ => None,
        };
        if simple.is_some() {
            return simple;
        }

        let (part, cmp) = match name.split_once("__") {
            Some((part, cmp)) => (part, Cmp::parse(cmp)?),
            None => (name, Cmp::Exact),
        };
        DatePart::ALL
            .into_iter()
            .find(|p| p.as_str() == part)
            .map(|p| Lookup::Part(p, cmp))
    }

    /// Splits a `field__lookup` key at the first `__` whose remainder is a
    /// recognised lookup. Keys without one use [`Lookup::Exact`].
    pub fn split_key(key: &str) -> (&str, Lookup) {
        let mut search_from = 0;
        while let Some(pos) = key[search_from..].find("__") {
            let split = search_from + pos;
            if let Some(lookup) = Lookup::parse(&key[split + 2..]) {
                if split > 0 {
                    return (&key[..split], lookup);
                }
            }
            search_from = split + 2;
        }
        (key, Lookup::Exact)
    }

    /// Returns `true` if this lookup has meaning for fields of `kind`.
    pub fn applies_to(self, kind: FieldKind) -> bool {
        use FieldKind::*;
        match self {
            Lookup::Exact | Lookup::Ne | Lookup::IsNull => true,
            Lookup::In => !matches!(kind, Boolean),
            Lookup::Range | Lookup::Lt | Lookup::Lte | Lookup::Gt | Lookup::Gte => {
                matches!(kind, Text | Number | Date)
            }
            Lookup::IExact
            | Lookup::Contains
            | Lookup::IContains
            | Lookup::StartsWith
            | Lookup::IStartsWith
            | Lookup::EndsWith
            | Lookup::IEndsWith
            | Lookup::Regex
            | Lookup::IRegex => matches!(kind, Text),
            Lookup::Part(..) => matches!(kind, Date),
        }
    }

    /// Returns the default lookup list for a kind.
    pub const fn defaults_for(kind: FieldKind) -> &'static [Lookup] {
        match kind {
            FieldKind::Text => TEXT_LOOKUPS,
            FieldKind::Number => NUMBER_LOOKUPS,
            FieldKind::Date => DATE_LOOKUPS,
            FieldKind::Choice => CHOICE_LOOKUPS,
            FieldKind::Boolean => BOOL_LOOKUPS,
        }
    }

    /// Returns `true` for the case-insensitive text lookups.
    pub fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            Lookup::IExact
                | Lookup::IContains
                | Lookup::IStartsWith
                | Lookup::IEndsWith
                | Lookup::IRegex
        )
    }

    /// The ordering comparison this lookup performs, if it is one.
    pub fn as_cmp(self) -> Option<Cmp> {
        match self {
            Lookup::Exact => Some(Cmp::Exact),
            Lookup::Ne => Some(Cmp::Ne),
            Lookup::Lt => Some(Cmp::Lt),
            Lookup::Lte => Some(Cmp::Lte),
            Lookup::Gt => Some(Cmp::Gt),
            Lookup::Gte => Some(Cmp::Gte),
            _ => None,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Ne => "ne",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::StartsWith => "startswith",
            Lookup::IStartsWith => "istartswith",
            Lookup::EndsWith => "endswith",
            Lookup::IEndsWith => "iendswith",
            Lookup::Regex => "regex",
            Lookup::IRegex => "iregex",
            Lookup::In => "in",
            Lookup::Range => "range",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::IsNull => "isnull",
            Lookup::Part(part, Cmp::Exact) => return write!(f, "{}", part.as_str()),
            Lookup::Part(part, cmp) => return write!(f, "{}__{}", part.as_str(), cmp.as_str()),
        };
        f.write_str(name)
    }
}
