/// Tabular dataset handed to the import pipeline
///
/// A `Table` is built once from parser output and never mutated afterwards;
/// a new upload replaces it wholesale.
use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// One data row: column name to cell value, in header order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Cell value for an exact column name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Build a table, checking that every record carries exactly the header columns
    ///
    /// Headers must be unique ignoring ASCII case, since column lookup ignores it.
    pub fn new(headers: Vec<String>, rows: Vec<Record>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        if let Some(dup) = headers
            .iter()
            .find(|h| !seen.insert(h.to_ascii_lowercase()))
        {
            return Err(AppError::ParseError(format!("Duplicate column '{}'", dup)));
        }

        for (idx, row) in rows.iter().enumerate() {
            let matches = row.len() == headers.len()
                && headers.iter().all(|h| row.get(h).is_some());
            if !matches {
                return Err(AppError::ParseError(format!(
                    "Row {} does not match the header columns",
                    idx + 1
                )));
            }
        }

        Ok(Self { headers, rows })
    }

    /// Build a table from positional cells aligned with `headers`
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> AppResult<Self> {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| {
                if cells.len() != headers.len() {
                    return Err(AppError::ParseError(format!(
                        "Row {} has {} cells, expected {}",
                        idx + 1,
                        cells.len(),
                        headers.len()
                    )));
                }
                Ok(Record::new(headers.iter().cloned().zip(cells).collect()))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(headers, records)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header matching `name` ignoring ASCII case
    pub fn find_column(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Header-ordered cells for at most `limit` rows
    pub fn preview(&self, limit: usize) -> TablePreview {
        let rows = self
            .rows
            .iter()
            .take(limit)
            .map(|record| {
                self.headers
                    .iter()
                    .map(|h| record.get(h).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();

        TablePreview {
            columns: self.headers.clone(),
            rows,
            truncated: self.rows.len() > limit,
        }
    }
}

/// Contiguous, order-preserving slice of a table sent as one upsert request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Position in the batch sequence, 0-based
    pub index: usize,
    /// Table row index of the first record, 0-based
    pub first_row: usize,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn row_range(&self) -> Range<usize> {
        self.first_row..self.first_row + self.records.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub truncated: bool,
}
