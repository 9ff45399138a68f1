//! Keyset pagination.
//!
//! Pages are cut from the `(created, id)` order. Every scan asks the store
//! for one row more than the page size; the extra row only says whether
//! another page exists and is never returned.

use serde::Serialize;

use crate::compile::CompiledQuery;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::ordering::Dir;
use crate::store::{Bound, Keyed, RecordStore};

/// One page of results with continuation cursors.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub results: Vec<R>,
    /// Continues after the last result. `None` once the forward scan is
    /// exhausted.
    pub next: Option<Cursor>,
    /// Returns the page before the first result, if there is one.
    pub previous: Option<Cursor>,
}

/// The wire form of a page: continuation cursors rendered as links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResponse<R> {
    pub results: Vec<R>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Cuts pages of a compiled query out of a store.
#[derive(Debug)]
pub struct Paginator<'s, S> {
    store: &'s S,
}

impl<'s, S: RecordStore> Paginator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Paginator { store }
    }

    /// The first page of results.
    pub fn first_page(
        &self,
        query: &CompiledQuery<S::Predicate>,
        page_size: usize,
    ) -> Result<Page<S::Record>> {
        self.fetch(query, Bound::Start, page_size)
    }

    /// The page a cursor points at.
    ///
    /// Fails with [`Error::BadCursor`] if the cursor does not decode or was
    /// minted by a different query.
    pub fn next_page(
        &self,
        query: &CompiledQuery<S::Predicate>,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<Page<S::Record>> {
        let position = cursor.decode(&query.fingerprint)?;
        let bound = match position.dir {
            Dir::Asc => Bound::After(position.key),
            Dir::Desc => Bound::Before(position.key),
        };
        self.fetch(query, bound, page_size)
    }

    fn fetch(
        &self,
        query: &CompiledQuery<S::Predicate>,
        bound: Bound,
        page_size: usize,
    ) -> Result<Page<S::Record>> {
        let page_size = page_size.max(1);
        let mut rows = self
            .store
            .scan(&query.predicate, bound, page_size.saturating_add(1))
            .map_err(Error::store)?;
        let has_more = rows.len() > page_size;
        rows.truncate(page_size);
        tracing::debug!(?bound, page_size, returned = rows.len(), has_more, "fetched page");

        let fingerprint = query.fingerprint.as_str();
        let first = rows.first().map(|r| r.seek_key());
        let last = rows.last().map(|r| r.seek_key());

        let (next, previous) = match bound {
            Bound::Start => (if has_more { last } else { None }, None),
            Bound::After(_) => (if has_more { last } else { None }, first),
            Bound::Before(_) => {
                rows.reverse();
                // Scanned descending, so `first` is the newest row.
                (first, if has_more { last } else { None })
            }
        };

        Ok(Page {
            results: rows,
            next: next
                .map(|key| Cursor::encode(key, Dir::Asc, fingerprint))
                .transpose()?,
            previous: previous
                .map(|key| Cursor::encode(key, Dir::Desc, fingerprint))
                .transpose()?,
        })
    }
}
