//! Error types for the query engine.
//!
//! Field-level problems ([`QueryError`]) are collected across a whole
//! expression into [`ValidationErrors`] so one response can report every
//! invalid field. Request-level failures are [`Error`], which the transport
//! layer maps through [`Error::kind`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::schema::FieldKind;

/// Key used for structural errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A problem with one leaf (or one combinator) of a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The field name does not resolve in the schema registry.
    #[error("Unknown field.")]
    UnknownField,

    /// The lookup is not legal for the field.
    #[error("Lookup '{lookup}' is not supported for {kind} fields.")]
    UnsupportedLookup { lookup: String, kind: FieldKind },

    /// The raw value could not be coerced to the field's type.
    #[error("{0}")]
    BadValue(String),

    /// Range bounds are malformed or inverted.
    #[error("{0}")]
    BadRange(String),

    /// The expression itself is not shaped correctly.
    #[error("{0}")]
    Malformed(String),
}

/// A [`QueryError`] tagged with the key it was reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub error: QueryError,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: QueryError) -> Self {
        FieldError {
            field: field.into(),
            error,
        }
    }
}

/// Every validation failure found in one request, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors::default()
    }

    /// Shorthand for a single error.
    pub fn single(field: impl Into<String>, error: QueryError) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(field, error);
        errors
    }

    /// Records an error. An identical `(field, error)` pair is kept once.
    pub fn push(&mut self, field: impl Into<String>, error: QueryError) {
        let entry = FieldError::new(field, error);
        if !self.errors.contains(&entry) {
            self.errors.push(entry);
        }
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for entry in other.errors {
            self.push(entry.field, entry.error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Returns the errors reported against `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a QueryError> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| &e.error)
    }

    /// Converts `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// The client-facing error body: field name to list of messages.
    pub fn to_response(&self) -> BTreeMap<String, Vec<String>> {
        let mut body: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in &self.errors {
            body.entry(entry.field.clone())
                .or_default()
                .push(entry.error.to_string());
        }
        body
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid filter")?;
        for (i, entry) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", entry.field, entry.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// How the transport layer should treat an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The client sent something invalid (400).
    Validation,
    /// The addressed thing does not exist (404).
    NotFound,
    /// Anything else (500).
    Internal,
}

/// Request-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The pagination cursor is malformed, stale, or belongs to another query.
    #[error("Invalid cursor")]
    BadCursor,

    /// A named resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The record store failed.
    #[error("record store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The engine configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Wraps any store error.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Store(Box::new(err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::BadCursor | Error::NotFound(_) => ErrorKind::NotFound,
            Error::Store(_) | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// Returns the validation errors, if this is a validation failure.
    pub fn validation(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
