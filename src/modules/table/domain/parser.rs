use super::entities::Table;
use crate::shared::errors::AppResult;

/// Turns raw uploaded text into a `Table`
///
/// The first row supplies the headers; blank lines are skipped. Malformed
/// input is reported as `AppError::ParseError`.
pub trait TableParser: Send + Sync {
    fn parse(&self, raw: &str) -> AppResult<Table>;
}
