/// Domain entities for remote deployment jobs
///
/// One `DeployJob` tracks one batch from submission until the remote service
/// reports a terminal status.
use crate::modules::table::Batch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque deployment identifier returned by the upsert endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a single batch submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployJobStatus {
    Pending,
    Polling,
    DoneSuccess,
    DoneFailure,
    SubmitFailed,
}

impl std::fmt::Display for DeployJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployJobStatus::Pending => write!(f, "pending"),
            DeployJobStatus::Polling => write!(f, "polling"),
            DeployJobStatus::DoneSuccess => write!(f, "done_success"),
            DeployJobStatus::DoneFailure => write!(f, "done_failure"),
            DeployJobStatus::SubmitFailed => write!(f, "submit_failed"),
        }
    }
}

impl std::str::FromStr for DeployJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeployJobStatus::Pending),
            "polling" => Ok(DeployJobStatus::Polling),
            "done_success" => Ok(DeployJobStatus::DoneSuccess),
            "done_failure" => Ok(DeployJobStatus::DoneFailure),
            "submit_failed" => Ok(DeployJobStatus::SubmitFailed),
            _ => Err(format!("Invalid deploy job status: {}", s)),
        }
    }
}

/// Response of the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub done: bool,
    pub success: bool,
    #[serde(default)]
    pub result: String,
}

/// How a UI should color a deployment result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultTone {
    Info,
    Success,
    Error,
}

impl DeploymentStatus {
    pub fn in_progress() -> Self {
        Self::default()
    }

    pub fn succeeded(result: impl Into<String>) -> Self {
        Self {
            done: true,
            success: true,
            result: result.into(),
        }
    }

    pub fn failed(result: impl Into<String>) -> Self {
        Self {
            done: true,
            success: false,
            result: result.into(),
        }
    }

    /// Text to show for this status
    pub fn message(&self) -> &str {
        if self.done {
            &self.result
        } else {
            "Deployment in progress"
        }
    }

    pub fn tone(&self) -> ResultTone {
        match (self.done, self.success) {
            (false, _) => ResultTone::Info,
            (true, true) => ResultTone::Success,
            (true, false) => ResultTone::Error,
        }
    }
}

/// One batch's remote submission, owned by the import orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployJob {
    pub batch_index: usize,
    pub row_count: usize,
    pub handle: Option<JobHandle>,
    pub status: DeployJobStatus,
    pub last_response: Option<DeploymentStatus>,
    pub error: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeployJob {
    pub fn pending(batch_index: usize, row_count: usize) -> Self {
        Self {
            batch_index,
            row_count,
            handle: None,
            status: DeployJobStatus::Pending,
            last_response: None,
            error: None,
            submitted_at: None,
            completed_at: None,
        }
    }

    pub fn mark_polling(&mut self, handle: JobHandle) {
        self.handle = Some(handle);
        self.status = DeployJobStatus::Polling;
        self.submitted_at = Some(Utc::now());
    }

    pub fn mark_submit_failed(&mut self, error: impl Into<String>) {
        self.status = DeployJobStatus::SubmitFailed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = DeployJobStatus::DoneFailure;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Store the latest poll response, finishing the job when it is terminal
    pub fn record_response(&mut self, response: DeploymentStatus) {
        if response.done {
            self.completed_at = Some(Utc::now());
            if response.success {
                self.status = DeployJobStatus::DoneSuccess;
            } else {
                self.status = DeployJobStatus::DoneFailure;
                self.error = Some(response.result.clone());
            }
        }
        self.last_response = Some(response);
    }
}

/// Single column/value pair in the upsert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub field_name: String,
    pub field_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWrapper {
    pub fields: Vec<FieldValue>,
}

/// Body of one upsert call: every record of a batch for one target type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub cmd_type: String,
    pub records: Vec<RecordWrapper>,
}

impl UpsertRequest {
    pub fn from_batch(target_type: &str, batch: &Batch) -> Self {
        let records = batch
            .records
            .iter()
            .map(|record| RecordWrapper {
                fields: record
                    .iter()
                    .map(|(name, value)| FieldValue {
                        field_name: name.to_string(),
                        field_value: value.to_string(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            cmd_type: target_type.to_string(),
            records,
        }
    }
}
