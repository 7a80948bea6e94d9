pub mod batcher;
pub mod import_orchestrator;
pub mod types;
pub mod validation_service;

pub use batcher::Batcher;
pub use import_orchestrator::{ImportOrchestrator, RunEvent};
pub use types::*;
pub use validation_service::TableValidator;
