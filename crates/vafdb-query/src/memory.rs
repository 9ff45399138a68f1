//! In-memory record store.
//!
//! [`MemoryStore`] keeps VAF records in a `BTreeMap` keyed by [`SeekKey`],
//! so keyset scans are range walks. Predicates are evaluated record by
//! record through [`FieldAccess`].

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound as RangeBound;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clause::Clause;
use crate::compile::PredicateBuilder;
use crate::error::{Error, QueryError, Result, ValidationErrors};
use crate::ordering::SeekKey;
use crate::record::{Metadata, Vaf, VafRecord};
use crate::store::{Bound, FieldAccess, RecordStore};

/// Failures of the in-memory store itself.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory store lock poisoned")]
    Poisoned,
}

/// Predicate tree evaluated against records in memory.
#[derive(Debug, Clone)]
pub enum MemoryPredicate {
    All,
    Leaf(Arc<Clause>),
    And(Box<MemoryPredicate>, Box<MemoryPredicate>),
    Or(Box<MemoryPredicate>, Box<MemoryPredicate>),
    Not(Box<MemoryPredicate>),
}

impl MemoryPredicate {
    pub fn eval<R: FieldAccess + ?Sized>(&self, record: &R) -> bool {
        match self {
            MemoryPredicate::All => true,
            MemoryPredicate::Leaf(clause) => clause.matches(&record.field_value(&clause.path)),
            MemoryPredicate::And(a, b) => a.eval(record) && b.eval(record),
            MemoryPredicate::Or(a, b) => a.eval(record) || b.eval(record),
            MemoryPredicate::Not(a) => !a.eval(record),
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<SeekKey, VafRecord>,
    samples: HashMap<String, Arc<Metadata>>,
    next_id: u64,
}

/// Thread-safe in-memory store of samples and their VAF records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Stores a sample and its records, stamped with the current time.
    pub fn insert(&self, metadata: Metadata, vafs: Vec<Vaf>) -> Result<usize> {
        self.insert_at(Utc::now(), metadata, vafs)
    }

    /// Stores a sample and its records with an explicit creation time.
    ///
    /// Records of one sample share `created` and are ordered by insertion.
    /// Returns the number of records stored.
    pub fn insert_at(&self, created: DateTime<Utc>, metadata: Metadata, vafs: Vec<Vaf>) -> Result<usize> {
        let mut tables = self.tables.write().map_err(|_| Error::store(MemoryError::Poisoned))?;
        if tables.samples.contains_key(&metadata.sample_id) {
            return Err(ValidationErrors::single(
                "sample_id",
                QueryError::BadValue("Metadata with this sample_id already exists.".to_string()),
            )
            .into());
        }

        let metadata = Arc::new(metadata);
        tables
            .samples
            .insert(metadata.sample_id.clone(), Arc::clone(&metadata));

        let count = vafs.len();
        for vaf in vafs {
            let id = tables.next_id;
            tables.next_id += 1;
            let record = VafRecord {
                id,
                created,
                metadata: Arc::clone(&metadata),
                vaf,
            };
            tables.records.insert(SeekKey::new(created, id), record);
        }
        tracing::debug!(sample_id = %metadata.sample_id, records = count, "stored sample");
        Ok(count)
    }

    /// Removes a sample and every record that belongs to it.
    pub fn remove_sample(&self, sample_id: &str) -> Result<usize> {
        let mut tables = self.tables.write().map_err(|_| Error::store(MemoryError::Poisoned))?;
        if tables.samples.remove(sample_id).is_none() {
            return Err(Error::NotFound(format!("sample '{sample_id}'")));
        }
        let before = tables.records.len();
        tables
            .records
            .retain(|_, record| record.metadata.sample_id != sample_id);
        let removed = before - tables.records.len();
        tracing::debug!(sample_id, records = removed, "removed sample");
        Ok(removed)
    }

    pub fn sample(&self, sample_id: &str) -> Option<Arc<Metadata>> {
        let tables = self.tables.read().ok()?;
        tables.samples.get(sample_id).cloned()
    }

    /// Number of stored VAF records.
    pub fn len(&self) -> usize {
        self.tables.read().map_or(0, |t| t.records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PredicateBuilder for MemoryStore {
    type Predicate = MemoryPredicate;

    fn everything(&self) -> MemoryPredicate {
        MemoryPredicate::All
    }

    fn leaf(&self, clause: &Clause) -> MemoryPredicate {
        MemoryPredicate::Leaf(Arc::new(clause.clone()))
    }

    fn and(&self, a: MemoryPredicate, b: MemoryPredicate) -> MemoryPredicate {
        MemoryPredicate::And(Box::new(a), Box::new(b))
    }

    fn or(&self, a: MemoryPredicate, b: MemoryPredicate) -> MemoryPredicate {
        MemoryPredicate::Or(Box::new(a), Box::new(b))
    }

    fn not(&self, a: MemoryPredicate) -> MemoryPredicate {
        MemoryPredicate::Not(Box::new(a))
    }
}

impl RecordStore for MemoryStore {
    type Record = VafRecord;
    type Error = MemoryError;

    fn scan(
        &self,
        predicate: &MemoryPredicate,
        bound: Bound,
        limit: usize,
    ) -> std::result::Result<Vec<VafRecord>, MemoryError> {
        let tables = self.tables.read().map_err(|_| MemoryError::Poisoned)?;
        let matching = |record: &&VafRecord| predicate.eval(*record);

        let rows: Vec<VafRecord> = match bound {
            Bound::Start => tables
                .records
                .values()
                .filter(matching)
                .take(limit)
                .cloned()
                .collect(),
            Bound::After(key) => tables
                .records
                .range((RangeBound::Excluded(key), RangeBound::Unbounded))
                .map(|(_, record)| record)
                .filter(matching)
                .take(limit)
                .cloned()
                .collect(),
            Bound::Before(key) => tables
                .records
                .range(..key)
                .rev()
                .map(|(_, record)| record)
                .filter(matching)
                .take(limit)
                .cloned()
                .collect(),
        };
        tracing::debug!(?bound, limit, returned = rows.len(), "memory scan");
        Ok(rows)
    }
}
