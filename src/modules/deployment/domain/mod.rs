pub mod client;
pub mod entities;
pub mod errors;

pub use client::DeploymentClient;
pub use entities::{
    DeployJob, DeployJobStatus, DeploymentStatus, FieldValue, JobHandle, RecordWrapper,
    ResultTone, UpsertRequest,
};
pub use errors::{PollError, SubmitError, UNKNOWN_FAILURE_HINT};
