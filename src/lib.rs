pub mod modules;
pub mod shared;

pub use modules::data_import::{
    FailureReport, FailureStage, ImportHandle, ImportService, ImportSnapshot, ImportState,
    ValidationIssue,
};
pub use modules::deployment::{
    DeploymentClient, DeploymentStatus, HttpDeploymentClient, JobHandle, UpsertRequest,
};
pub use modules::notification::{LogNotificationSink, Notification, NotificationSink, Severity};
pub use modules::table::{CsvTableParser, Table, TableParser};
pub use shared::{AppConfig, AppError, AppResult};
