use crate::modules::deployment::{DeployJob, DeploymentStatus};
use crate::modules::table::{Table, TablePreview};
use crate::shared::config::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Advisory data-quality finding; never blocks submission on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// 1-based row number as a user counts data rows
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationRules {
    pub required_columns: Vec<String>,
    pub unique_columns: Vec<String>,
}

impl ValidationRules {
    pub fn new(required_columns: Vec<String>, unique_columns: Vec<String>) -> Self {
        Self {
            required_columns,
            unique_columns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.required_columns.clone(), config.unique_columns.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Submit,
    Poll,
    Job,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Submit => write!(f, "submit"),
            FailureStage::Poll => write!(f, "poll"),
            FailureStage::Job => write!(f, "job"),
        }
    }
}

/// Where a run stopped and how much of it had already been applied remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// 0-based index of the batch that failed
    pub batch_index: usize,
    pub total_batches: usize,
    /// Batches that finished successfully before the failure; these stay applied
    pub applied_batches: usize,
    pub stage: FailureStage,
    pub message: String,
}

impl FailureReport {
    pub fn summary(&self) -> String {
        let applied = match self.applied_batches {
            0 => "No batches were applied".to_string(),
            1 => "1 batch was already applied and is not rolled back".to_string(),
            n => format!("{} batches were already applied and are not rolled back", n),
        };
        format!(
            "Deployment failed at batch {} of {}: {}. {}.",
            self.batch_index + 1,
            self.total_batches,
            self.message,
            applied
        )
    }
}

/// Phase of an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    Parsed,
    Validated,
    Deploying { batch_index: usize },
    Polling { batch_index: usize },
    Completed,
    Failed(FailureReport),
}

impl ImportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed(_))
    }

    /// True while a batch is being submitted or polled
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ImportState::Deploying { .. } | ImportState::Polling { .. }
        )
    }

    pub fn batch_index(&self) -> Option<usize> {
        match self {
            ImportState::Deploying { batch_index } | ImportState::Polling { batch_index } => {
                Some(*batch_index)
            }
            ImportState::Failed(report) => Some(report.batch_index),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportState::Idle => write!(f, "idle"),
            ImportState::Parsed => write!(f, "parsed"),
            ImportState::Validated => write!(f, "validated"),
            ImportState::Deploying { batch_index } => write!(f, "deploying batch {}", batch_index + 1),
            ImportState::Polling { batch_index } => write!(f, "polling batch {}", batch_index + 1),
            ImportState::Completed => write!(f, "completed"),
            ImportState::Failed(report) => write!(f, "failed at batch {}", report.batch_index + 1),
        }
    }
}

/// Read-only view of the current run, published after every change
#[derive(Debug, Clone, Serialize)]
pub struct ImportSnapshot {
    pub run_id: Option<Uuid>,
    pub state: ImportState,
    #[serde(skip)]
    pub table: Option<Arc<Table>>,
    pub issues: Vec<ValidationIssue>,
    pub missing_columns: Vec<String>,
    pub target_type: Option<String>,
    pub jobs: Vec<DeployJob>,
    /// One entry per batch that has produced at least one status response, in batch order
    pub results: Vec<DeploymentStatus>,
    pub can_submit: bool,
    pub is_submitting: bool,
    pub preview_rows: usize,
}

impl ImportSnapshot {
    pub fn row_count(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.len())
    }

    pub fn total_batches(&self) -> usize {
        self.jobs.len()
    }

    pub fn too_many_rows_for_preview(&self) -> bool {
        self.row_count() > self.preview_rows
    }

    /// Preview of the loaded table; capped unless `show_anyway` is set
    pub fn preview(&self, show_anyway: bool) -> Option<TablePreview> {
        let table = self.table.as_ref()?;
        let limit = if show_anyway {
            table.len()
        } else {
            self.preview_rows
        };
        Some(table.preview(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_summary_mentions_applied_batches() {
        let report = FailureReport {
            batch_index: 2,
            total_batches: 4,
            applied_batches: 2,
            stage: FailureStage::Job,
            message: "Field Label__c missing".to_string(),
        };
        assert_eq!(
            report.summary(),
            "Deployment failed at batch 3 of 4: Field Label__c missing. 2 batches were already applied and are not rolled back."
        );
    }

    #[test]
    fn test_state_helpers() {
        assert!(ImportState::Completed.is_terminal());
        assert!(!ImportState::Validated.is_terminal());
        assert!(ImportState::Polling { batch_index: 1 }.is_active());
        assert_eq!(ImportState::Deploying { batch_index: 3 }.batch_index(), Some(3));
        assert_eq!(ImportState::Polling { batch_index: 0 }.to_string(), "polling batch 1");
    }

    #[test]
    fn test_preview_cap() {
        let rows = (0..5).map(|i| vec![format!("R{}", i)]).collect();
        let table = Table::from_rows(vec!["DeveloperName".to_string()], rows).unwrap();
        let snapshot = ImportSnapshot {
            run_id: None,
            state: ImportState::Validated,
            table: Some(Arc::new(table)),
            issues: vec![],
            missing_columns: vec![],
            target_type: None,
            jobs: vec![],
            results: vec![],
            can_submit: false,
            is_submitting: false,
            preview_rows: 2,
        };

        assert!(snapshot.too_many_rows_for_preview());
        assert_eq!(snapshot.preview(false).unwrap().rows.len(), 2);
        assert_eq!(snapshot.preview(true).unwrap().rows.len(), 5);
    }
}
