//! Flat, string-keyed tables and their CSV serialization.
//!
//! Rows are JSON objects because the LLM decides what keys a degree or a
//! visit carries. Columns are the table's canonical names first, then any
//! extra key in order of first appearance, so every row's data lands in
//! the file and the header is stable for well-behaved input.

use crate::error::Bio2CsvError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: &'static str,
    canonical: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: &'static str, canonical: &[&str]) -> Self {
        Self {
            name,
            canonical: canonical.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// `{name}.csv`
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    /// Header: canonical columns, then extra keys by first appearance.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.canonical.clone();
        for row in &self.rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// Write the table to `dir/{name}.csv`, header included even when empty.
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf, Bio2CsvError> {
        let path = dir.join(self.file_name());
        let fail = |detail: String| Bio2CsvError::TableWriteFailed {
            path: path.clone(),
            detail,
        };

        let columns = self.columns();
        let mut writer = csv::Writer::from_path(&path).map_err(|e| fail(e.to_string()))?;
        writer
            .write_record(&columns)
            .map_err(|e| fail(e.to_string()))?;
        for row in &self.rows {
            let record = columns.iter().map(|c| cell(row.get(c)));
            writer
                .write_record(record)
                .map_err(|e| fail(e.to_string()))?;
        }
        writer.flush().map_err(|e| fail(e.to_string()))?;

        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(path)
    }
}

/// CSV cell text: absent/null empty, strings raw, everything else as
/// compact JSON.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
