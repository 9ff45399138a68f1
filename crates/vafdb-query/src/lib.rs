//! vafdb-query - validated filter expressions and cursor pagination over
//! sample metadata and VAF records.
//!
//! The engine takes a client-supplied boolean expression over named fields,
//! checks and coerces every leaf against a declarative field table, lowers
//! the result onto a record store's predicate primitives, and serves the
//! matching records one keyset page at a time.
//!
//! - Two request shapes: flat `field__lookup=value` pairs (all ANDed) or a
//!   nested JSON expression using `&`, `|`, `^` and `~`
//! - Django-style lookups: `exact`, `ne`, `lt`/`lte`/`gt`/`gte`, `in`,
//!   `range`, text matching, regex, `isnull`, and date parts
//! - Every validation error in a request reported at once
//! - Opaque cursors bound to the query that minted them
//!
//! # Quick Start
//!
//! ```rust
//! use vafdb_query::{EngineConfig, MemoryStore, Metadata, QueryEngine, QueryRequest, Vaf};
//!
//! let store = MemoryStore::new();
//! let sample = Metadata {
//!     sample_id: "S1".into(),
//!     site_code: "BIRM".into(),
//!     pathogen: "SARS-COV-2".into(),
//!     bam_path: "/data/S1.bam".into(),
//!     collection_date: None,
//!     published_date: None,
//!     num_reads: None,
//!     mean_coverage: None,
//!     mean_entropy: None,
//!     references: None,
//!     suppressed: false,
//! };
//! let vaf = |position, coverage| Vaf {
//!     reference: "MN908947.3".into(),
//!     position,
//!     coverage,
//!     num_a: coverage, num_c: 0, num_g: 0, num_t: 0, num_ds: 0,
//!     pc_a: 100.0, pc_c: 0.0, pc_g: 0.0, pc_t: 0.0, pc_ds: 0.0,
//!     entropy: 0.0,
//!     secondary_entropy: 0.0,
//! };
//! store.insert(sample, vec![vaf(1, 5), vaf(2, 20), vaf(3, 45)]).unwrap();
//!
//! let engine = QueryEngine::new(store, EngineConfig::default()).unwrap();
//! let request = QueryRequest::simple([("coverage__gte", "20")]);
//! let coverages: Vec<i64> = engine
//!     .records(request)
//!     .map(|r| r.unwrap().vaf.coverage)
//!     .collect();
//! assert_eq!(coverages, vec![20, 45]);
//! ```
//!
//! # Expression Semantics
//!
//! ```text
//! {"&": [a, b, ...]}   all children match
//! {"|": [a, b, ...]}   at least one child matches
//! {"^": [a, b, ...]}   folded left to right: (a ∨ b) ∧ ¬(a ∧ b)
//! {"~": [a]}           the child does not match
//! {"field__lookup": v} leaf; the lookup defaults to `exact`
//! ```
//!
//! A null field only ever matches `isnull=true`, so `{"~": [{"x": 1}]}`
//! matches records where `x` is null.
//!
//! # Field Kinds and Lookups
//!
//! | Kind | Lookups |
//! |------|---------|
//! | Text | `exact`, `ne`, `in`, `range`, `lt`, `lte`, `gt`, `gte`, `isnull`, `iexact`, `contains`, `icontains`, `startswith`, `istartswith`, `endswith`, `iendswith`, `regex`, `iregex` |
//! | Number | `exact`, `ne`, `in`, `range`, `lt`, `lte`, `gt`, `gte`, `isnull` |
//! | Date | number lookups plus `year`, `month`, `day` (optionally `__ne`, `__lt`, `__lte`, `__gt`, `__gte`) |
//! | Choice | `exact`, `ne`, `in`, `isnull` |
//! | Boolean | `exact`, `ne`, `isnull` |

mod clause;
mod client;
mod coerce;
mod compile;
mod config;
mod cursor;
mod engine;
mod error;
mod expr;
mod lookup;
mod memory;
mod ordering;
mod page;
mod record;
mod request;
mod schema;
mod store;
mod validate;
mod value;

// Re-export public API
pub use clause::{Clause, ClauseValue};
pub use client::{EngineSource, PageSource, Records};
pub use coerce::{coerce, coerce_scalar};
pub use compile::{compile, compile_query, fingerprint, CompiledQuery, PredicateBuilder};
pub use config::EngineConfig;
pub use cursor::{Cursor, Position};
pub use engine::{QueryEngine, EXPRESSION_PATH, SIMPLE_PATH};
pub use error::{
    Error, ErrorKind, FieldError, QueryError, Result, ValidationErrors, NON_FIELD_ERRORS,
};
pub use expr::{parse_expression, parse_expression_partial, parse_simple, Expr, RawLeaf};
pub use lookup::{
    Cmp, DatePart, Lookup, BOOL_LOOKUPS, CHOICE_LOOKUPS, DATE_LOOKUPS, NUMBER_LOOKUPS,
    TEXT_LOOKUPS,
};
pub use memory::{MemoryError, MemoryPredicate, MemoryStore};
pub use ordering::{Dir, SeekKey};
pub use page::{Page, PageResponse, Paginator};
pub use record::{Metadata, Vaf, VafRecord};
pub use request::{FilterInput, QueryRequest};
pub use schema::{FieldKind, FieldPath, FieldSpec, Namespace, Registry, SchemaError, PATHOGENS};
pub use store::{Bound, FieldAccess, Keyed, RecordStore};
pub use validate::{validate, validate_leaf};
pub use value::{Number, Scalar, Value};
