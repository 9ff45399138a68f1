//! Request context.
//!
//! A [`QueryRequest`] is built once per round trip with the pagination
//! parameters already separated from the filter, so nothing downstream has
//! to strip them back out.

use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::error::{Error, QueryError, Result, ValidationErrors};

/// The filter half of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    /// Flat `field__lookup=value` pairs, all ANDed.
    Simple(Vec<(String, String)>),
    /// A nested JSON expression.
    Expression(serde_json::Value),
}

impl FilterInput {
    pub fn is_expression(&self) -> bool {
        matches!(self, FilterInput::Expression(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub filter: FilterInput,
    pub cursor: Option<Cursor>,
    pub page_size: Option<usize>,
}

impl QueryRequest {
    pub fn simple<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        QueryRequest {
            filter: FilterInput::Simple(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            cursor: None,
            page_size: None,
        }
    }

    pub fn expression(json: serde_json::Value) -> Self {
        QueryRequest {
            filter: FilterInput::Expression(json),
            cursor: None,
            page_size: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Builds a simple-mode request from a URL query string (without the
    /// leading `?`). The configured cursor and page size parameters are
    /// pulled out; every other pair is a filter.
    pub fn from_query_string(query: &str, config: &EngineConfig) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|e| {
            Error::Validation(ValidationErrors::single(
                crate::error::NON_FIELD_ERRORS,
                QueryError::Malformed(format!("Malformed query string: {e}")),
            ))
        })?;

        let mut filters = Vec::with_capacity(pairs.len());
        let mut cursor = None;
        let mut page_size = None;
        for (key, value) in pairs {
            if !config.is_reserved(&key) {
                filters.push((key, value));
            } else if key == config.cursor_param {
                cursor = Some(Cursor::new(value));
            } else {
                page_size = Some(parse_page_size(&key, &value)?);
            }
        }

        Ok(QueryRequest {
            filter: FilterInput::Simple(filters),
            cursor,
            page_size,
        })
    }

    /// Rebuilds a request from a `next`/`previous` link. Expression-mode
    /// links are re-posted with the original `body`.
    pub fn from_link(link: &str, body: Option<&serde_json::Value>, config: &EngineConfig) -> Result<Self> {
        let query = link.split_once('?').map_or("", |(_, q)| q);
        let query = query.split_once('#').map_or(query, |(q, _)| q);
        let mut request = QueryRequest::from_query_string(query, config)?;
        if let Some(body) = body {
            request.filter = FilterInput::Expression(body.clone());
        }
        Ok(request)
    }
}

fn parse_page_size(key: &str, value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|_| {
        Error::Validation(ValidationErrors::single(
            key,
            QueryError::BadValue("A valid integer is required.".to_string()),
        ))
    })
}
