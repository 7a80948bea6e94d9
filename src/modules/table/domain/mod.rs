pub mod entities;
pub mod parser;

pub use entities::{Batch, Record, Table, TablePreview};
pub use parser::TableParser;
