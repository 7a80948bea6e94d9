/// Collaborator trait for the remote metadata service
///
/// Implementations perform exactly one request per call; retry policy, if
/// any, belongs to the caller.
use crate::modules::deployment::domain::entities::{DeploymentStatus, JobHandle, UpsertRequest};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Schedule an upsert; `Ok(None)` means the service accepted the call but returned no handle
    async fn upsert_records(&self, request: &UpsertRequest) -> AppResult<Option<String>>;

    /// Fetch the current status of a scheduled deployment
    async fn check_deployment(&self, handle: &JobHandle) -> AppResult<DeploymentStatus>;
}
