/// Sends one batch to the remote service and returns its deployment handle
use crate::modules::deployment::domain::{DeploymentClient, JobHandle, SubmitError, UpsertRequest};
use crate::modules::table::Batch;
use crate::shared::utils::{LogContext, TimedOperation};
use crate::{log_debug, log_warn};
use std::sync::Arc;

pub struct DeploymentSubmitter {
    client: Arc<dyn DeploymentClient>,
}

impl DeploymentSubmitter {
    pub fn new(client: Arc<dyn DeploymentClient>) -> Self {
        Self { client }
    }

    /// Issue exactly one upsert call for `batch`
    ///
    /// A missing or blank handle becomes `SubmitError::UnknownFailure`; any
    /// transport or service error becomes `SubmitError::Transport`.
    pub async fn submit(&self, batch: &Batch, target_type: &str) -> Result<JobHandle, SubmitError> {
        let request = UpsertRequest::from_batch(target_type, batch);
        log_debug!(
            "Submitting batch {} (rows {:?}) as {}",
            batch.index,
            batch.row_range(),
            target_type
        );
        let timer = TimedOperation::new("submit batch");

        match self.client.upsert_records(&request).await {
            Ok(Some(id)) if !id.trim().is_empty() => {
                timer.finish_with_info(&format!("batch {} -> {}", batch.index, id.trim()));
                Ok(JobHandle::new(id.trim()))
            }
            Ok(_) => {
                log_warn!("Upsert for batch {} returned no deployment handle", batch.index);
                Err(SubmitError::UnknownFailure)
            }
            Err(e) => {
                LogContext::error_with_context(&e, &format!("Upsert for batch {}", batch.index));
                Err(SubmitError::Transport(e.to_string()))
            }
        }
    }
}
