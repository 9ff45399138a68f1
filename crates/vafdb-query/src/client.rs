//! Client-side iteration over paginated results.
//!
//! [`Records`] hides pagination: it fetches the first page, then follows
//! each response's `next` link verbatim until a page comes back without
//! one. Records are yielded as they arrive; a failed fetch is yielded once
//! and can be retried with [`Records::retry`].

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::engine::QueryEngine;
use crate::error::Error;
use crate::page::PageResponse;
use crate::request::{FilterInput, QueryRequest};
use crate::store::RecordStore;

/// Anything that can serve pages by link.
pub trait PageSource {
    type Record;
    type Error;

    /// Fetches the first page when `link` is `None`, otherwise the page a
    /// previously returned link points at.
    fn fetch(&mut self, link: Option<&str>) -> Result<PageResponse<Self::Record>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// Fetch with this link (`None` = first page).
    Fetch(Option<String>),
    /// The last fetch with this link failed.
    Failed(Option<String>),
    Done,
}

/// Lazy iterator over every record of a paginated result set.
pub struct Records<S: PageSource> {
    source: S,
    buffer: VecDeque<S::Record>,
    step: Step,
    pages: usize,
}

impl<S: PageSource> Records<S> {
    pub fn new(source: S) -> Self {
        Records {
            source,
            buffer: VecDeque::new(),
            step: Step::Fetch(None),
            pages: 0,
        }
    }

    /// Re-arms the iterator after a failed fetch; the same link is fetched
    /// again. Returns `false` if nothing had failed.
    pub fn retry(&mut self) -> bool {
        match std::mem::replace(&mut self.step, Step::Done) {
            Step::Failed(link) => {
                self.step = Step::Fetch(link);
                true
            }
            other => {
                self.step = other;
                false
            }
        }
    }

    /// Starts over from the first page. Buffered records are dropped.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.step = Step::Fetch(None);
    }

    /// Returns `true` after a fetch failed and before [`Records::retry`].
    pub fn is_failed(&self) -> bool {
        matches!(self.step, Step::Failed(_))
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: PageSource> Iterator for Records<S> {
    type Item = Result<S::Record, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            let link = match &self.step {
                Step::Fetch(link) => link.clone(),
                Step::Failed(_) | Step::Done => return None,
            };
            match self.source.fetch(link.as_deref()) {
                Ok(page) => {
                    self.pages += 1;
                    self.buffer.extend(page.results);
                    self.step = match page.next {
                        Some(next) => Step::Fetch(Some(next)),
                        None => Step::Done,
                    };
                }
                Err(err) => {
                    self.step = Step::Failed(link);
                    return Some(Err(err));
                }
            }
        }
    }
}

/// In-process page source backed by a [`QueryEngine`].
///
/// Links are turned back into requests the way an HTTP server would;
/// expression-mode links are re-posted with the original body.
pub struct EngineSource<'e, 'r, S> {
    engine: &'e QueryEngine<'r, S>,
    first: QueryRequest,
}

impl<'e, 'r, S: RecordStore> EngineSource<'e, 'r, S> {
    pub fn new(engine: &'e QueryEngine<'r, S>, first: QueryRequest) -> Self {
        EngineSource { engine, first }
    }

    fn config(&self) -> &EngineConfig {
        self.engine.config()
    }
}

impl<S: RecordStore> PageSource for EngineSource<'_, '_, S> {
    type Record = S::Record;
    type Error = Error;

    fn fetch(&mut self, link: Option<&str>) -> Result<PageResponse<S::Record>, Error> {
        let Some(link) = link else {
            return self.engine.execute(&self.first);
        };
        let body = match &self.first.filter {
            FilterInput::Expression(json) => Some(json),
            FilterInput::Simple(_) => None,
        };
        let request = QueryRequest::from_link(link, body, self.config())?;
        self.engine.execute(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves fixed pages; links are page indexes.
    struct Pages {
        pages: Vec<Vec<u32>>,
        fail_on: Option<usize>,
        fetched: Vec<Option<String>>,
    }

    impl Pages {
        fn new(pages: Vec<Vec<u32>>) -> Self {
            Pages {
                pages,
                fail_on: None,
                fetched: Vec::new(),
            }
        }
    }

    impl PageSource for Pages {
        type Record = u32;
        type Error = String;

        fn fetch(&mut self, link: Option<&str>) -> Result<PageResponse<u32>, String> {
            self.fetched.push(link.map(str::to_string));
            let index: usize = link.map_or(0, |l| l.parse().unwrap());
            if self.fail_on == Some(index) {
                self.fail_on = None;
                return Err(format!("page {index} unavailable"));
            }
            let next = index + 1;
            Ok(PageResponse {
                results: self.pages[index].clone(),
                next: (next < self.pages.len()).then(|| next.to_string()),
                previous: None,
            })
        }
    }

    #[test]
    fn follows_next_links() {
        let mut records = Records::new(Pages::new(vec![vec![1, 2], vec![3], vec![4, 5]]));
        let all: Vec<u32> = records.by_ref().map(Result::unwrap).collect();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        assert_eq!(records.pages(), 3);
        assert_eq!(
            records.source().fetched,
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[test]
    fn skips_empty_pages() {
        let records = Records::new(Pages::new(vec![vec![], vec![7], vec![]]));
        let all: Vec<u32> = records.map(Result::unwrap).collect();
        assert_eq!(all, vec![7]);
    }

    #[test]
    fn failure_surfaces_once_then_retries_same_link() {
        let mut source = Pages::new(vec![vec![1], vec![2], vec![3]]);
        source.fail_on = Some(1);
        let mut records = Records::new(source);

        assert_eq!(records.next(), Some(Ok(1)));
        assert_eq!(records.next(), Some(Err("page 1 unavailable".to_string())));
        assert_eq!(records.next(), None);
        assert!(records.is_failed());

        assert!(records.retry());
        let rest: Vec<u32> = records.by_ref().map(Result::unwrap).collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(
            records.source().fetched[1..3],
            [Some("1".to_string()), Some("1".to_string())]
        );
        assert!(!records.retry());
    }

    #[test]
    fn restart_begins_again() {
        let mut records = Records::new(Pages::new(vec![vec![1], vec![2]]));
        assert_eq!(records.next(), Some(Ok(1)));
        records.restart();
        let all: Vec<u32> = records.map(Result::unwrap).collect();
        assert_eq!(all, vec![1, 2]);
    }
}
