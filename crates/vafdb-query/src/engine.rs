//! The query engine facade.
//!
//! One [`QueryEngine::execute`] call serves one round trip: parse, validate,
//! compile, cut a page, and render continuation links. The engine keeps no
//! state between calls.

use crate::client::{EngineSource, Records};
use crate::compile::{compile_query, CompiledQuery};
use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::error::{Error, QueryError, Result, ValidationErrors};
use crate::clause::Clause;
use crate::expr::{parse_expression_partial, parse_simple, Expr};
use crate::page::{Page, PageResponse, Paginator};
use crate::request::{FilterInput, QueryRequest};
use crate::schema::Registry;
use crate::store::RecordStore;
use crate::validate::validate;

/// Path serving simple-mode requests.
pub const SIMPLE_PATH: &str = "/data/";
/// Path serving expression-mode requests.
pub const EXPRESSION_PATH: &str = "/data/query/";

pub struct QueryEngine<'r, S> {
    registry: &'r Registry,
    store: S,
    config: EngineConfig,
}

impl<S: RecordStore> QueryEngine<'static, S> {
    /// Builds an engine over the global field table.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(QueryEngine {
            registry: Registry::global(),
            store,
            config,
        })
    }
}

impl<'r, S: RecordStore> QueryEngine<'r, S> {
    /// Swaps in another field table.
    pub fn with_registry<'a>(self, registry: &'a Registry) -> QueryEngine<'a, S> {
        QueryEngine {
            registry,
            store: self.store,
            config: self.config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Parses, validates and compiles a filter.
    pub fn prepare(&self, filter: &FilterInput) -> Result<CompiledQuery<S::Predicate>> {
        let validated = match filter {
            FilterInput::Simple(pairs) => validate(&parse_simple(pairs.iter().cloned()), self.registry)?,
            FilterInput::Expression(json) => self.validate_expression(json)?,
        };
        Ok(compile_query(&validated, &self.store))
    }

    /// Structural errors and leaf errors are reported together: leaves
    /// that parsed are validated even when other nodes are malformed.
    fn validate_expression(
        &self,
        json: &serde_json::Value,
    ) -> std::result::Result<Expr<Clause>, ValidationErrors> {
        let (raw, mut errors) = parse_expression_partial(json);
        let validated = match raw {
            Some(raw) => validate(&raw, self.registry),
            None => Err(ValidationErrors::new()),
        };
        match validated {
            Ok(tree) if errors.is_empty() => Ok(tree),
            Ok(_) => Err(errors),
            Err(leaf_errors) => {
                errors.extend(leaf_errors);
                Err(errors)
            }
        }
    }

    /// Serves one page.
    pub fn execute(&self, request: &QueryRequest) -> Result<PageResponse<S::Record>> {
        let page_size = self.page_size(request.page_size)?;
        let query = self.prepare(&request.filter)?;

        let paginator = Paginator::new(&self.store);
        let page = match &request.cursor {
            Some(cursor) => paginator.next_page(&query, cursor, page_size)?,
            None => paginator.first_page(&query, page_size)?,
        };

        let mode = if request.filter.is_expression() {
            "expression"
        } else {
            "simple"
        };
        tracing::info!(
            mode,
            fingerprint = %query.fingerprint,
            page_size,
            returned = page.results.len(),
            has_next = page.next.is_some(),
            "executed query"
        );

        let Page {
            results,
            next,
            previous,
        } = page;
        Ok(PageResponse {
            results,
            next: next.map(|c| self.link(request, &c, page_size)),
            previous: previous.map(|c| self.link(request, &c, page_size)),
        })
    }

    /// Iterates over every matching record, following `next` links.
    pub fn records(&self, request: QueryRequest) -> Records<EngineSource<'_, 'r, S>> {
        Records::new(EngineSource::new(self, request))
    }

    /// The page size to serve: the configured default, or the requested
    /// size clamped to the configured maximum.
    pub fn page_size(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.config.page_size),
            Some(0) => Err(Error::Validation(ValidationErrors::single(
                self.config.page_size_param.clone(),
                QueryError::BadValue("Ensure this value is greater than or equal to 1.".to_string()),
            ))),
            Some(n) => Ok(n.min(self.config.max_page_size)),
        }
    }

    fn link(&self, request: &QueryRequest, cursor: &Cursor, page_size: usize) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        let path = match &request.filter {
            FilterInput::Simple(pairs) => {
                params.extend(pairs.iter().map(|(k, v)| (k.as_str(), v.clone())));
                SIMPLE_PATH
            }
            FilterInput::Expression(_) => EXPRESSION_PATH,
        };
        params.push((self.config.cursor_param.as_str(), cursor.as_str().to_string()));
        if request.page_size.is_some() {
            params.push((self.config.page_size_param.as_str(), page_size.to_string()));
        }
        // Pairs of strings always encode.
        let query = serde_urlencoded::to_string(&params).unwrap_or_default();
        format!("{}{path}?{query}", self.config.base())
    }
}
