/// Batch import pipeline
///
/// Validates a loaded table, splits it into batches and deploys them one at a
/// time, waiting for each remote job to finish before submitting the next.
pub mod application;
pub mod domain;

pub use application::{ImportHandle, ImportService};
pub use domain::{
    Batcher, FailureReport, FailureStage, ImportOrchestrator, ImportSnapshot, ImportState,
    RunEvent, TableValidator, ValidationIssue, ValidationRules,
};
