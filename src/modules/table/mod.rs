/// Tabular input for the loader
///
/// - Domain: `Record`, `Table` and the `TableParser` collaborator trait
/// - Infrastructure: CSV implementation of `TableParser`
pub mod domain;
pub mod infrastructure;

pub use domain::{Batch, Record, Table, TableParser, TablePreview};
pub use infrastructure::CsvTableParser;
