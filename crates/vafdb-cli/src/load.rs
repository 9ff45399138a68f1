//! Loading joined sample/VAF tables into the in-memory store.
//!
//! Each row of the table is one VAF record carrying its sample's metadata
//! columns. Rows are grouped by `sample_id`; the first row of a sample
//! supplies its metadata.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use vafdb_query::{MemoryStore, Metadata, Vaf};

/// Field separator of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Tab for `.tsv` files, comma otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => Delimiter::Tab,
            _ => Delimiter::Comma,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    sample_id: String,
    site_code: String,
    pathogen: String,
    bam_path: String,
    collection_date: Option<NaiveDate>,
    published_date: Option<NaiveDate>,
    num_reads: Option<i64>,
    mean_coverage: Option<f64>,
    mean_entropy: Option<f64>,
    references: Option<String>,
    #[serde(default)]
    suppressed: bool,
    reference: String,
    position: i64,
    coverage: i64,
    num_a: i64,
    num_c: i64,
    num_g: i64,
    num_t: i64,
    num_ds: i64,
    pc_a: f64,
    pc_c: f64,
    pc_g: f64,
    pc_t: f64,
    pc_ds: f64,
    entropy: f64,
    secondary_entropy: f64,
}

impl Row {
    fn split(self) -> (Metadata, Vaf) {
        let metadata = Metadata {
            sample_id: self.sample_id,
            site_code: self.site_code,
            pathogen: self.pathogen.to_uppercase(),
            bam_path: self.bam_path,
            collection_date: self.collection_date,
            published_date: self.published_date,
            num_reads: self.num_reads,
            mean_coverage: self.mean_coverage,
            mean_entropy: self.mean_entropy,
            references: self.references.filter(|r| !r.is_empty()),
            suppressed: self.suppressed,
        };
        let vaf = Vaf {
            reference: self.reference,
            position: self.position,
            coverage: self.coverage,
            num_a: self.num_a,
            num_c: self.num_c,
            num_g: self.num_g,
            num_t: self.num_t,
            num_ds: self.num_ds,
            pc_a: self.pc_a,
            pc_c: self.pc_c,
            pc_g: self.pc_g,
            pc_t: self.pc_t,
            pc_ds: self.pc_ds,
            entropy: self.entropy,
            secondary_entropy: self.secondary_entropy,
        };
        (metadata, vaf)
    }
}

/// Reads a table into samples with their records, in first-seen order.
pub fn read_table<R: Read>(reader: R, delimiter: Delimiter) -> Result<Vec<(Metadata, Vec<Vaf>)>> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples: Vec<(Metadata, Vec<Vaf>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (line, row) in csv.deserialize::<Row>().enumerate() {
        // Line 1 is the header.
        let row = row.with_context(|| format!("invalid row on line {}", line + 2))?;
        let (metadata, vaf) = row.split();
        match index.get(&metadata.sample_id) {
            Some(&i) => samples[i].1.push(vaf),
            None => {
                index.insert(metadata.sample_id.clone(), samples.len());
                samples.push((metadata, vec![vaf]));
            }
        }
    }
    Ok(samples)
}

/// Loads a table file into `store`, returning the number of records.
pub fn load_table(path: &Path, delimiter: Delimiter, store: &MemoryStore) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let samples = read_table(file, delimiter).with_context(|| format!("cannot read {}", path.display()))?;

    let mut total = 0;
    let count = samples.len();
    for (metadata, vafs) in samples {
        let sample_id = metadata.sample_id.clone();
        total += store
            .insert(metadata, vafs)
            .with_context(|| format!("cannot store sample {sample_id}"))?;
    }
    tracing::info!(path = %path.display(), samples = count, records = total, "loaded table");
    Ok(total)
}
