use super::types::{ValidationIssue, ValidationRules};
use crate::log_debug;
use crate::modules::table::Table;
use std::collections::{HashMap, HashSet};

/// Flags blank required values and repeated unique values
///
/// Column lookup ignores ASCII case. Required columns that are absent from the
/// header are reported by `missing_columns` instead of once per row.
#[derive(Debug, Clone, Default)]
pub struct TableValidator {
    rules: ValidationRules,
}

impl TableValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Required columns with no matching header, in rule order
    pub fn missing_columns(&self, table: &Table) -> Vec<String> {
        self.rules
            .required_columns
            .iter()
            .filter(|column| table.find_column(column).is_none())
            .cloned()
            .collect()
    }

    /// Issues in row order; within a row, blank checks come before duplicate checks
    pub fn validate(&self, table: &Table) -> Vec<ValidationIssue> {
        let required = resolve(table, &self.rules.required_columns);
        let unique = resolve(table, &self.rules.unique_columns);

        let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut issues = Vec::new();

        for (idx, record) in table.rows().iter().enumerate() {
            let row = idx + 1;

            for (name, header) in &required {
                let value = record.get(header).unwrap_or_default();
                if value.trim().is_empty() {
                    issues.push(ValidationIssue {
                        row,
                        message: format!("Row {} - {} cannot be blank", row, name),
                    });
                }
            }

            for (name, header) in &unique {
                let value = record.get(header).unwrap_or_default();
                // Blank keys are already reported above
                if value.trim().is_empty() {
                    continue;
                }
                if !seen.entry(*header).or_default().insert(value) {
                    issues.push(ValidationIssue {
                        row,
                        message: format!("Row {} - {} {} occurs more than one time", row, name, value),
                    });
                }
            }
        }

        log_debug!(
            "Validated {} rows: {} issues",
            table.len(),
            issues.len()
        );
        issues
    }
}

/// Pair each configured column with the header it matches, dropping absent and repeated ones
fn resolve<'a>(table: &'a Table, columns: &'a [String]) -> Vec<(&'a str, &'a str)> {
    let mut resolved: Vec<(&str, &str)> = Vec::new();
    for column in columns {
        if let Some(header) = table.find_column(column) {
            if !resolved.iter().any(|(_, h)| *h == header) {
                resolved.push((column.as_str(), header));
            }
        }
    }
    resolved
}
