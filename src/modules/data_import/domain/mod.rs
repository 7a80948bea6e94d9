pub mod services;

pub use services::import_components::{
    Batcher, FailureReport, FailureStage, ImportOrchestrator, ImportSnapshot, ImportState,
    RunEvent, TableValidator, ValidationIssue, ValidationRules,
};
