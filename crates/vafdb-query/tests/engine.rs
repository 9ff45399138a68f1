//! End-to-end tests through the query engine facade.

use std::cell::Cell;
use std::collections::HashSet;

use chrono::{NaiveDate, TimeZone, Utc};
use insta::assert_json_snapshot;
use serde_json::json;
use vafdb_query::{
    Bound, Clause, Cursor, EngineConfig, Error, ErrorKind, MemoryError, MemoryPredicate,
    MemoryStore, Metadata, PredicateBuilder, QueryEngine, QueryError, QueryRequest, RecordStore,
    Vaf, VafRecord,
};

// ============================================================================
// Fixtures
// ============================================================================

fn metadata(sample_id: &str, pathogen: &str, collection_date: Option<NaiveDate>) -> Metadata {
    Metadata {
        sample_id: sample_id.to_string(),
        site_code: "BIRM".to_string(),
        pathogen: pathogen.to_string(),
        bam_path: format!("/data/{sample_id}.bam"),
        collection_date,
        published_date: None,
        num_reads: Some(10_000),
        mean_coverage: None,
        mean_entropy: None,
        references: Some("MN908947.3".to_string()),
        suppressed: false,
    }
}

fn vaf(position: i64, coverage: i64) -> Vaf {
    Vaf {
        reference: "MN908947.3".to_string(),
        position,
        coverage,
        num_a: coverage / 2,
        num_c: coverage - coverage / 2,
        num_g: 0,
        num_t: 0,
        num_ds: 0,
        pc_a: 50.0,
        pc_c: 50.0,
        pc_g: 0.0,
        pc_t: 0.0,
        pc_ds: 0.0,
        entropy: 1.0,
        secondary_entropy: 0.0,
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// One sample with coverages 5, 20, 45, 100 at positions 1..=4, created
/// at a sub-microsecond instant.
fn coverage_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_at(
            Utc.timestamp_opt(1_650_000_000, 123_456_789).unwrap(),
            metadata("S1", "SARS-COV-2", date(2022, 3, 1)),
            vec![vaf(1, 5), vaf(2, 20), vaf(3, 45), vaf(4, 100)],
        )
        .unwrap();
    store
}

fn engine(store: MemoryStore) -> QueryEngine<'static, MemoryStore> {
    QueryEngine::new(store, EngineConfig::default()).unwrap()
}

fn coverages(records: &[VafRecord]) -> Vec<i64> {
    records.iter().map(|r| r.vaf.coverage).collect()
}

fn collect(engine: &QueryEngine<'_, MemoryStore>, request: QueryRequest) -> Vec<VafRecord> {
    engine.records(request).map(Result::unwrap).collect()
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn coverage_gte_returns_matching_records() {
    let engine = engine(coverage_store());
    let response = engine
        .execute(&QueryRequest::expression(json!({"coverage__gte": "20"})))
        .unwrap();
    assert_eq!(coverages(&response.results), vec![20, 45, 100]);
    assert!(response.next.is_none());

    let stored = vec![vaf(2, 20), vaf(3, 45), vaf(4, 100)];
    for (record, expected) in response.results.iter().zip(&stored) {
        assert_eq!(&record.vaf, expected);
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["coverage"], expected.coverage);
        assert_eq!(json["position"], expected.position);
        assert_eq!(json["pc_a"], 50.0);
        assert_eq!(json["sample_id"], "S1");
        assert_eq!(json["collection_date"], "2022-03-01");
    }
}

#[test]
fn and_of_bounds() {
    let engine = engine(coverage_store());
    let records = collect(
        &engine,
        QueryRequest::expression(json!({
            "&": [{"coverage__gte": "20"}, {"coverage__lt": "100"}]
        })),
    );
    assert_eq!(coverages(&records), vec![20, 45]);
}

#[test]
fn simple_mode_matches_expression_mode() {
    let engine = engine(coverage_store());
    let simple = collect(
        &engine,
        QueryRequest::simple([("coverage__gte", "20"), ("coverage__lt", "100")]),
    );
    assert_eq!(coverages(&simple), vec![20, 45]);
}

#[test]
fn simple_mode_repeated_field_is_anded() {
    let engine = engine(coverage_store());
    let records = collect(
        &engine,
        QueryRequest::simple([("coverage", "20"), ("coverage", "45")]),
    );
    assert!(records.is_empty());

    // The same pair in expression mode can be ORed.
    let records = collect(
        &engine,
        QueryRequest::expression(json!({"|": [{"coverage": 20}, {"coverage": 45}]})),
    );
    assert_eq!(coverages(&records), vec![20, 45]);
}

#[test]
fn empty_simple_request_returns_everything() {
    let engine = engine(coverage_store());
    let records = collect(&engine, QueryRequest::simple(Vec::<(String, String)>::new()));
    assert_eq!(records.len(), 4);
}

#[test]
fn metadata_fields_and_namespaces() {
    let store = coverage_store();
    store
        .insert_at(
            Utc.timestamp_opt(1_650_000_100, 0).unwrap(),
            metadata("S2", "MPXV", date(2023, 7, 14)),
            vec![vaf(1, 7)],
        )
        .unwrap();
    let engine = engine(store);

    let mpxv = collect(&engine, QueryRequest::simple([("pathogen", "mpxv")]));
    assert_eq!(coverages(&mpxv), vec![7]);

    let prefixed = collect(&engine, QueryRequest::simple([("metadata__sample_id", "S1")]));
    assert_eq!(prefixed.len(), 4);

    let recent = collect(
        &engine,
        QueryRequest::simple([("collection_date__year__gte", "2023")]),
    );
    assert_eq!(coverages(&recent), vec![7]);

    let march = collect(
        &engine,
        QueryRequest::simple([("collection_date__range", "2022-03-01,2022-03-31")]),
    );
    assert_eq!(march.len(), 4);
}

#[test]
fn null_fields() {
    let store = MemoryStore::new();
    store
        .insert(metadata("S1", "MPXV", None), vec![vaf(1, 1)])
        .unwrap();
    store
        .insert(metadata("S2", "MPXV", date(2022, 1, 1)), vec![vaf(1, 2)])
        .unwrap();
    let engine = engine(store);

    let missing = collect(
        &engine,
        QueryRequest::simple([("collection_date__isnull", "true")]),
    );
    assert_eq!(coverages(&missing), vec![1]);

    // Null never satisfies a comparison, so negation picks it up.
    let not_2022 = collect(
        &engine,
        QueryRequest::expression(json!({"~": [{"collection_date__year": 2022}]})),
    );
    assert_eq!(coverages(&not_2022), vec![1]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn unknown_field_error_body() {
    let engine = engine(coverage_store());
    let err = engine
        .execute(&QueryRequest::expression(json!({"bogus_field": "1"})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_json_snapshot!(err.validation().unwrap().to_response(), @r###"
    {
      "bogus_field": [
        "Unknown field."
      ]
    }
    "###);
}

#[test]
fn every_invalid_leaf_is_reported() {
    let engine = engine(coverage_store());
    let err = engine
        .execute(&QueryRequest::expression(json!({
            "|": [
                {"coverage__range": "100,5"},
                {"coverage__contains": "1"},
                {"collection_date": "01/03/2022"},
                {"pathogen": "ebola"}
            ]
        })))
        .unwrap_err();
    assert_json_snapshot!(err.validation().unwrap().to_response(), @r###"
    {
      "collection_date": [
        "Enter a valid date."
      ],
      "coverage__contains": [
        "Lookup 'contains' is not supported for number fields."
      ],
      "coverage__range": [
        "Range start 100 is greater than range end 5."
      ],
      "pathogen": [
        "Select a valid choice. ebola is not one of the available choices."
      ]
    }
    "###);
}

#[test]
fn inverted_range_is_bad_range() {
    let engine = engine(coverage_store());
    let err = engine
        .execute(&QueryRequest::simple([("coverage__range", "100,5")]))
        .unwrap_err();
    let errors = err.validation().unwrap();
    assert!(matches!(
        errors.for_field("coverage__range").next(),
        Some(QueryError::BadRange(_))
    ));
}

#[test]
fn malformed_expression() {
    let engine = engine(coverage_store());
    let err = engine
        .execute(&QueryRequest::expression(json!({"~": [{"coverage": 1}, {"coverage": 2}]})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.validation().unwrap().for_field("~").next().is_some());
}

#[test]
fn structural_and_leaf_errors_reported_together() {
    let engine = engine(coverage_store());
    let err = engine
        .execute(&QueryRequest::expression(json!({
            "&": [
                {"bogus_field": "1"},
                {"~": []},
                {"|": [{"coverage__gte": "many"}, 7]}
            ]
        })))
        .unwrap_err();
    assert_json_snapshot!(err.validation().unwrap().to_response(), @r###"
    {
      "bogus_field": [
        "Unknown field."
      ],
      "coverage__gte": [
        "Enter a number."
      ],
      "non_field_errors": [
        "Expected an object, found a number."
      ],
      "~": [
        "Expected exactly one operand, found 0."
      ]
    }
    "###);
}

/// Wraps a store and counts how often it is scanned.
struct CountingStore {
    inner: MemoryStore,
    scans: Cell<usize>,
    fail: bool,
}

impl CountingStore {
    fn new(inner: MemoryStore) -> Self {
        CountingStore {
            inner,
            scans: Cell::new(0),
            fail: false,
        }
    }
}

impl PredicateBuilder for CountingStore {
    type Predicate = MemoryPredicate;

    fn everything(&self) -> MemoryPredicate {
        self.inner.everything()
    }
    fn leaf(&self, clause: &Clause) -> MemoryPredicate {
        self.inner.leaf(clause)
    }
    fn and(&self, a: MemoryPredicate, b: MemoryPredicate) -> MemoryPredicate {
        self.inner.and(a, b)
    }
    fn or(&self, a: MemoryPredicate, b: MemoryPredicate) -> MemoryPredicate {
        self.inner.or(a, b)
    }
    fn not(&self, a: MemoryPredicate) -> MemoryPredicate {
        self.inner.not(a)
    }
}

impl RecordStore for CountingStore {
    type Record = VafRecord;
    type Error = MemoryError;

    fn scan(
        &self,
        predicate: &MemoryPredicate,
        bound: Bound,
        limit: usize,
    ) -> Result<Vec<VafRecord>, MemoryError> {
        self.scans.set(self.scans.get() + 1);
        if self.fail {
            return Err(MemoryError::Poisoned);
        }
        self.inner.scan(predicate, bound, limit)
    }
}

#[test]
fn invalid_request_never_scans() {
    let engine =
        QueryEngine::new(CountingStore::new(coverage_store()), EngineConfig::default()).unwrap();
    assert!(engine
        .execute(&QueryRequest::expression(json!({"bogus_field": "1"})))
        .is_err());
    assert_eq!(engine.store().scans.get(), 0);

    engine
        .execute(&QueryRequest::expression(json!({"coverage": "5"})))
        .unwrap();
    assert_eq!(engine.store().scans.get(), 1);
}

#[test]
fn store_failure_is_internal() {
    let mut store = CountingStore::new(coverage_store());
    store.fail = true;
    let engine = QueryEngine::new(store, EngineConfig::default()).unwrap();
    let err = engine
        .execute(&QueryRequest::simple([("coverage", "5")]))
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
}

// ============================================================================
// Pagination
// ============================================================================

/// `n` samples, three per second, each at a nanosecond-precise instant.
fn numbered_store(n: i64) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..n {
        store
            .insert_at(
                Utc.timestamp_opt(1_650_000_000 + i / 3, 999_999_001).unwrap(),
                metadata(&format!("S{i}"), "SARS-COV-2", date(2022, 1, 1)),
                vec![vaf(i, i)],
            )
            .unwrap();
    }
    store
}

#[test]
fn pages_cover_everything_exactly_once() {
    const N: i64 = 10;
    let engine = engine(numbered_store(N));
    for page_size in [1usize, N as usize, N as usize + 1, 3] {
        let mut request = QueryRequest::simple(Vec::<(String, String)>::new()).with_page_size(page_size);
        let mut seen = Vec::new();
        let mut pages = 0;
        loop {
            let response = engine.execute(&request).unwrap();
            pages += 1;
            seen.extend(response.results.iter().map(|r| r.vaf.position));
            match response.next {
                Some(link) => request = QueryRequest::from_link(&link, None, engine.config()).unwrap(),
                None => break,
            }
        }
        let unique: HashSet<i64> = seen.iter().copied().collect();
        assert_eq!(seen.len(), N as usize, "page size {page_size}");
        assert_eq!(unique.len(), N as usize, "page size {page_size}");
        assert_eq!(seen, (0..N).collect::<Vec<_>>());
        assert_eq!(pages, (N as usize).div_ceil(page_size));
    }
}

#[test]
fn pages_over_clock_stamped_inserts() {
    let store = MemoryStore::new();
    store
        .insert(metadata("S1", "MPXV", None), vec![vaf(1, 5), vaf(2, 20)])
        .unwrap();
    store
        .insert(metadata("S2", "MPXV", None), vec![vaf(1, 45)])
        .unwrap();
    let engine = engine(store);

    let request = QueryRequest::simple(Vec::<(String, String)>::new()).with_page_size(1);
    let mut records = engine.records(request);
    let seen: Vec<i64> = records
        .by_ref()
        .take(10)
        .map(|r| r.unwrap().vaf.coverage)
        .collect();
    assert_eq!(seen, vec![5, 20, 45]);
    assert_eq!(records.pages(), 3);
}

#[test]
fn single_row_pages_walk_back_and_forth() {
    let engine = engine(coverage_store());
    let first = engine
        .execute(&QueryRequest::simple(Vec::<(String, String)>::new()).with_page_size(1))
        .unwrap();
    let follow = |link: &Option<String>| {
        let request = QueryRequest::from_link(link.as_ref().unwrap(), None, engine.config()).unwrap();
        engine.execute(&request).unwrap()
    };
    let second = follow(&first.next);
    assert_eq!(coverages(&second.results), vec![20]);
    let third = follow(&second.next);
    assert_eq!(coverages(&third.results), vec![45]);
    let back = follow(&third.previous);
    assert_eq!(coverages(&back.results), vec![20]);
    let again = follow(&back.next);
    assert_eq!(coverages(&again.results), vec![45]);
}

#[test]
fn iterator_follows_expression_links() {
    let engine = engine(numbered_store(7));
    let request = QueryRequest::expression(json!({"|": [{"coverage__lt": 2}, {"coverage__gte": 4}]}))
        .with_page_size(2);
    let mut records = engine.records(request);
    let positions: Vec<i64> = records.by_ref().map(|r| r.unwrap().vaf.position).collect();
    assert_eq!(positions, vec![0, 1, 4, 5, 6]);
    assert_eq!(records.pages(), 3);
}

#[test]
fn previous_link_returns_preceding_page() {
    let engine = engine(numbered_store(5));
    let first = engine
        .execute(&QueryRequest::simple(Vec::<(String, String)>::new()).with_page_size(2))
        .unwrap();
    let second = engine
        .execute(&QueryRequest::from_link(first.next.as_ref().unwrap(), None, engine.config()).unwrap())
        .unwrap();
    assert_eq!(coverages(&second.results), vec![2, 3]);

    let back = engine
        .execute(
            &QueryRequest::from_link(second.previous.as_ref().unwrap(), None, engine.config())
                .unwrap(),
        )
        .unwrap();
    assert_eq!(coverages(&back.results), vec![0, 1]);
    assert!(back.previous.is_none());
}

#[test]
fn cursor_replayed_against_other_query() {
    let engine = engine(numbered_store(5));
    let first = engine
        .execute(&QueryRequest::simple([("coverage__gte", "0")]).with_page_size(1))
        .unwrap();
    let link = first.next.unwrap();
    let cursor = QueryRequest::from_link(&link, None, engine.config())
        .unwrap()
        .cursor
        .unwrap();

    let replay = QueryRequest::simple([("coverage__gte", "1")])
        .with_page_size(1)
        .with_cursor(cursor);
    let err = engine.execute(&replay).unwrap_err();
    assert!(matches!(err, Error::BadCursor));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Invalid cursor");
}

#[test]
fn garbage_cursor() {
    let engine = engine(numbered_store(2));
    let request = QueryRequest::simple(Vec::<(String, String)>::new()).with_cursor(Cursor::new("xyz"));
    assert!(matches!(engine.execute(&request), Err(Error::BadCursor)));
}

#[test]
fn oversized_page_is_clamped() {
    let config = EngineConfig {
        page_size: 2,
        max_page_size: 3,
        ..EngineConfig::default()
    };
    let engine = QueryEngine::new(numbered_store(5), config).unwrap();
    let response = engine
        .execute(&QueryRequest::simple(Vec::<(String, String)>::new()).with_page_size(100))
        .unwrap();
    assert_eq!(response.results.len(), 3);
    assert!(response.next.unwrap().ends_with("page_size=3"));
}

#[test]
fn query_string_round_trip() {
    let engine = engine(coverage_store());
    let request =
        QueryRequest::from_query_string("coverage__gte=20&page_size=1", engine.config()).unwrap();
    let mut seen = Vec::new();
    let mut response = engine.execute(&request).unwrap();
    loop {
        seen.extend(coverages(&response.results));
        let Some(link) = response.next else { break };
        let query = link.split_once('?').unwrap().1;
        let request = QueryRequest::from_query_string(query, engine.config()).unwrap();
        response = engine.execute(&request).unwrap();
    }
    assert_eq!(seen, vec![20, 45, 100]);
}

#[test]
fn removed_samples_disappear() {
    let store = coverage_store();
    store
        .insert(metadata("S2", "MPXV", None), vec![vaf(9, 9)])
        .unwrap();
    assert_eq!(store.remove_sample("S1").unwrap(), 4);
    let err = store.remove_sample("S1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let engine = engine(store);
    let records = collect(&engine, QueryRequest::simple(Vec::<(String, String)>::new()));
    assert_eq!(coverages(&records), vec![9]);
}
