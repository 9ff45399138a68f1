//! Raw string coercion into typed clause operands.

use chrono::NaiveDate;
use regex::RegexBuilder;

use crate::clause::ClauseValue;
use crate::error::QueryError;
use crate::lookup::Lookup;
use crate::schema::{FieldKind, FieldSpec};
use crate::value::{Number, Scalar};

const DATE_FORMAT: &str = "%Y-%m-%d";

const TRUE_WORDS: &[&str] = &["true", "t", "yes", "y", "1", "on"];
const FALSE_WORDS: &[&str] = &["false", "f", "no", "n", "0", "off"];

/// Coerces a raw client value for `spec` under `lookup`.
///
/// The lookup decides the operand's shape (single value, set, bounds,
/// pattern or null flag); the field kind decides how each element parses.
pub fn coerce(spec: &FieldSpec, lookup: Lookup, raw: &str) -> Result<ClauseValue, QueryError> {
    match lookup {
        Lookup::IsNull => parse_bool(raw).map(ClauseValue::IsNull),
        Lookup::In => split_list(raw)
            .map(|item| coerce_scalar(spec, item))
            .collect::<Result<Vec<_>, _>>()
            .map(ClauseValue::Set),
        Lookup::Range => coerce_range(spec, raw),
        Lookup::Regex | Lookup::IRegex => RegexBuilder::new(raw)
            .case_insensitive(lookup == Lookup::IRegex)
            .build()
            .map(ClauseValue::Pattern)
            .map_err(|err| QueryError::BadValue(format!("Invalid regular expression: {err}"))),
        Lookup::Part(..) => parse_integer(raw).map(|n| ClauseValue::Scalar(Scalar::Number(n))),
        lookup if lookup.is_case_insensitive() => {
            Ok(ClauseValue::Scalar(Scalar::Text(raw.to_lowercase())))
        }
        _ => coerce_scalar(spec, raw).map(ClauseValue::Scalar),
    }
}

fn coerce_range(spec: &FieldSpec, raw: &str) -> Result<ClauseValue, QueryError> {
    let bounds: Vec<&str> = split_list(raw).collect();
    let &[low, high] = bounds.as_slice() else {
        return Err(QueryError::BadRange(
            "Enter exactly two values separated by a comma.".to_string(),
        ));
    };
    let low = coerce_scalar(spec, low)?;
    let high = coerce_scalar(spec, high)?;
    if low.compare(&high) == Some(std::cmp::Ordering::Greater) {
        return Err(QueryError::BadRange(format!(
            "Range start {low} is greater than range end {high}."
        )));
    }
    Ok(ClauseValue::Range(low, high))
}

/// Coerces one element according to the field's kind.
pub fn coerce_scalar(spec: &FieldSpec, raw: &str) -> Result<Scalar, QueryError> {
    match spec.kind {
        FieldKind::Text => Ok(Scalar::Text(raw.to_string())),
        FieldKind::Number => Number::parse(raw)
            .map(Scalar::Number)
            .ok_or_else(|| QueryError::BadValue("Enter a number.".to_string())),
        FieldKind::Date => parse_date(raw).map(Scalar::Date),
        FieldKind::Boolean => parse_bool(raw).map(Scalar::Bool),
        FieldKind::Choice => {
            let upper = raw.trim().to_uppercase();
            let choices = spec.choices.unwrap_or_default();
            if choices.contains(&upper.as_str()) {
                Ok(Scalar::Text(upper))
            } else {
                Err(QueryError::BadValue(format!(
                    "Select a valid choice. {raw} is not one of the available choices."
                )))
            }
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim)
}

fn parse_date(raw: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| QueryError::BadValue("Enter a valid date.".to_string()))
}

fn parse_bool(raw: &str) -> Result<bool, QueryError> {
    let word = raw.trim().to_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Ok(false)
    } else {
        Err(QueryError::BadValue(format!(
            "'{raw}' value must be either True or False."
        )))
    }
}

fn parse_integer(raw: &str) -> Result<Number, QueryError> {
    raw.trim()
        .parse::<i64>()
        .map(Number::I64)
        .map_err(|_| QueryError::BadValue("Enter a whole number.".to_string()))
}
