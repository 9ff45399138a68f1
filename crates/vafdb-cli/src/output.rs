//! Record output: JSON lines, CSV or TSV.
//!
//! Records are written as they stream out of the iterator. Delimited output
//! takes its header from the first record's keys.

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value as Json;
use thiserror::Error;

/// Errors that can occur while writing records.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("delimited output needs object records")]
    NotAnObject,
}

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One JSON object per line.
    #[default]
    Json,
    Csv,
    Tsv,
}

enum Sink<W: Write> {
    Json(W),
    Delimited {
        writer: csv::Writer<W>,
        headers: Option<Vec<String>>,
    },
}

/// Streams records to a writer in the chosen format.
pub struct RecordWriter<W: Write> {
    sink: Sink<W>,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, mode: OutputMode) -> Self {
        let sink = match mode {
            OutputMode::Json => Sink::Json(out),
            OutputMode::Csv | OutputMode::Tsv => {
                let delimiter = if mode == OutputMode::Tsv { b'\t' } else { b',' };
                Sink::Delimited {
                    writer: csv::WriterBuilder::new()
                        .delimiter(delimiter)
                        .from_writer(out),
                    headers: None,
                }
            }
        };
        RecordWriter { sink, written: 0 }
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), OutputError> {
        match &mut self.sink {
            Sink::Json(out) => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")?;
            }
            Sink::Delimited { writer, headers } => {
                let Json::Object(obj) = serde_json::to_value(record)? else {
                    return Err(OutputError::NotAnObject);
                };
                if headers.is_none() {
                    let keys: Vec<String> = obj.keys().cloned().collect();
                    writer.write_record(&keys)?;
                    *headers = Some(keys);
                }
                let row: Vec<String> = headers
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .map(|h| obj.get(h).map(value_to_string).unwrap_or_default())
                    .collect();
                writer.write_record(&row)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes buffered output and hands back the writer.
    pub fn finish(self) -> Result<W, OutputError> {
        match self.sink {
            Sink::Json(mut out) => {
                out.flush()?;
                Ok(out)
            }
            Sink::Delimited { writer, .. } => writer
                .into_inner()
                .map_err(|e| OutputError::Io(e.into_error())),
        }
    }
}

/// Converts a JSON value to a cell; null is empty.
fn value_to_string(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}
