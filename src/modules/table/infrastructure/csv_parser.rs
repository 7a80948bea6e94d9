use crate::log_debug;
use crate::modules::table::domain::{Table, TableParser};
use crate::shared::errors::{AppError, AppResult};
use csv::{ReaderBuilder, Trim};

/// CSV implementation of the parser collaborator
#[derive(Debug, Clone, Default)]
pub struct CsvTableParser;

impl CsvTableParser {
    pub fn new() -> Self {
        Self
    }
}

impl TableParser for CsvTableParser {
    /// Headers are trimmed; cell values are kept exactly as written
    fn parse(&self, raw: &str) -> AppResult<Table> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_reader(raw.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(AppError::ParseError("Missing header row".to_string()));
        }

        // Blank lines never reach here; rows like ",," are kept and left to validation
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        log_debug!(
            "Parsed CSV with {} columns and {} rows",
            headers.len(),
            rows.len()
        );

        Table::from_rows(headers, rows)
    }
}
