/// Remote deployment of batches
///
/// - Domain: job entities, wire shapes, error taxonomy and the client trait
/// - Infrastructure: reqwest-backed client for the metadata loader service
/// - Submitter: one upsert call per batch
/// - Poller: cancellable status polling per scheduled deployment
pub mod domain;
pub mod infrastructure;
pub mod poller;
pub mod submitter;

pub use domain::{
    DeployJob, DeployJobStatus, DeploymentClient, DeploymentStatus, JobHandle, PollError,
    ResultTone, SubmitError, UpsertRequest, UNKNOWN_FAILURE_HINT,
};
pub use infrastructure::HttpDeploymentClient;
pub use poller::{DeploymentPoller, PollHandle, PollOutcome};
pub use submitter::DeploymentSubmitter;
