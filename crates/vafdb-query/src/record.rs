//! Sample metadata and VAF records.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ordering::SeekKey;
use crate::schema::FieldPath;
use crate::store::{FieldAccess, Keyed};
use crate::value::{Number, Value};

/// Per-sample metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub sample_id: String,
    pub site_code: String,
    pub pathogen: String,
    pub bam_path: String,
    pub collection_date: Option<NaiveDate>,
    pub published_date: Option<NaiveDate>,
    pub num_reads: Option<i64>,
    pub mean_coverage: Option<f64>,
    pub mean_entropy: Option<f64>,
    pub references: Option<String>,
    #[serde(default)]
    pub suppressed: bool,
}

impl Metadata {
    fn field_value(&self, column: &str) -> Value<'_> {
        match column {
            "sample_id" => Value::Text(&self.sample_id),
            "site_code" => Value::Text(&self.site_code),
            "pathogen" => Value::Text(&self.pathogen),
            "bam_path" => Value::Text(&self.bam_path),
            "collection_date" => self.collection_date.into(),
            "published_date" => self.published_date.into(),
            "num_reads" => self.num_reads.into(),
            "mean_coverage" => self.mean_coverage.into(),
            "mean_entropy" => self.mean_entropy.into(),
            "references" => self.references.as_deref().map_or(Value::None, Value::Text),
            "suppressed" => Value::Bool(self.suppressed),
            _ => Value::None,
        }
    }
}

/// Base counts and derived statistics at one reference position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vaf {
    pub reference: String,
    pub position: i64,
    pub coverage: i64,
    pub num_a: i64,
    pub num_c: i64,
    pub num_g: i64,
    pub num_t: i64,
    pub num_ds: i64,
    pub pc_a: f64,
    pub pc_c: f64,
    pub pc_g: f64,
    pub pc_t: f64,
    pub pc_ds: f64,
    pub entropy: f64,
    pub secondary_entropy: f64,
}

impl Vaf {
    fn field_value(&self, column: &str) -> Value<'_> {
        let int = |n: i64| Value::Number(Number::I64(n));
        let float = |n: f64| Value::Number(Number::F64(n));
        match column {
            "reference" => Value::Text(&self.reference),
            "position" => int(self.position),
            "coverage" => int(self.coverage),
            "num_a" => int(self.num_a),
            "num_c" => int(self.num_c),
            "num_g" => int(self.num_g),
            "num_t" => int(self.num_t),
            "num_ds" => int(self.num_ds),
            "pc_a" => float(self.pc_a),
            "pc_c" => float(self.pc_c),
            "pc_g" => float(self.pc_g),
            "pc_t" => float(self.pc_t),
            "pc_ds" => float(self.pc_ds),
            "entropy" => float(self.entropy),
            "secondary_entropy" => float(self.secondary_entropy),
            _ => Value::None,
        }
    }
}

/// A stored VAF record joined to its sample's metadata.
///
/// Serializes as one flat object: metadata fields, then VAF fields. The
/// store-assigned `id` and `created` only order records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VafRecord {
    #[serde(skip)]
    pub id: u64,
    #[serde(skip)]
    pub created: DateTime<Utc>,
    #[serde(flatten)]
    pub metadata: Arc<Metadata>,
    #[serde(flatten)]
    pub vaf: Vaf,
}

impl FieldAccess for VafRecord {
    fn field_value(&self, path: &FieldPath) -> Value<'_> {
        match path.relation {
            Some("metadata") => self.metadata.field_value(path.column),
            Some(_) => Value::None,
            None => self.vaf.field_value(path.column),
        }
    }
}

impl Keyed for VafRecord {
    fn seek_key(&self) -> SeekKey {
        SeekKey::new(self.created, self.id)
    }
}
