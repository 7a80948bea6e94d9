/// Scripted in-memory deployment service
///
/// Handles are `job-<batch>` in submission order. Every job reports
/// in-progress until it has been checked `checks_until_done` times.
use async_trait::async_trait;
use metaload_lib::modules::deployment::{
    DeploymentClient, DeploymentStatus, JobHandle, UpsertRequest,
};
use metaload_lib::shared::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum FakeFailure {
    /// Upsert succeeds but returns no handle
    NoHandle,
    /// Upsert fails at the transport level
    SubmitRefused,
    /// The job finishes unsuccessfully with this result text
    JobFailed(String),
    /// The status endpoint errors
    StatusError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Submit { batch: usize, rows: usize },
    Check { batch: usize, done: bool },
}

#[derive(Default)]
struct FakeState {
    requests: Vec<UpsertRequest>,
    checks: HashMap<usize, usize>,
    calls: Vec<FakeCall>,
    in_flight: usize,
    max_in_flight: usize,
}

pub struct FakeDeploymentClient {
    checks_until_done: usize,
    latency: Duration,
    failures: HashMap<usize, FakeFailure>,
    state: Mutex<FakeState>,
}

impl Default for FakeDeploymentClient {
    fn default() -> Self {
        Self {
            checks_until_done: 2,
            latency: Duration::ZERO,
            failures: HashMap::new(),
            state: Mutex::new(FakeState::default()),
        }
    }
}

impl FakeDeploymentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checks_until_done(mut self, checks: usize) -> Self {
        self.checks_until_done = checks;
        self
    }

    /// Delay applied to every status call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_batch(mut self, batch: usize, failure: FakeFailure) -> Self {
        self.failures.insert(batch, failure);
        self
    }

    pub fn requests(&self) -> Vec<UpsertRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn check_count(&self, batch: usize) -> usize {
        self.state
            .lock()
            .unwrap()
            .checks
            .get(&batch)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn batch_of(handle: &JobHandle) -> usize {
        handle
            .as_str()
            .strip_prefix("job-")
            .and_then(|n| n.parse().ok())
            .expect("handle issued by the fake")
    }
}

#[async_trait]
impl DeploymentClient for FakeDeploymentClient {
    async fn upsert_records(&self, request: &UpsertRequest) -> AppResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        let batch = state.requests.len();
        state.requests.push(request.clone());
        state.calls.push(FakeCall::Submit {
            batch,
            rows: request.records.len(),
        });

        match self.failures.get(&batch) {
            Some(FakeFailure::NoHandle) => Ok(None),
            Some(FakeFailure::SubmitRefused) => Err(AppError::ExternalServiceError(
                "Failed to connect to external service".to_string(),
            )),
            _ => Ok(Some(format!("job-{}", batch))),
        }
    }

    async fn check_deployment(&self, handle: &JobHandle) -> AppResult<DeploymentStatus> {
        let batch = Self::batch_of(handle);
        let checks = {
            let mut state = self.state.lock().unwrap();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let count = state.checks.entry(batch).or_insert(0);
            *count += 1;
            *count
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = match self.failures.get(&batch) {
            Some(FakeFailure::StatusError) => Err(AppError::ApiError(
                "HTTP 500 Internal Server Error".to_string(),
            )),
            _ if checks < self.checks_until_done => Ok(DeploymentStatus::in_progress()),
            Some(FakeFailure::JobFailed(message)) => Ok(DeploymentStatus::failed(message.clone())),
            _ => Ok(DeploymentStatus::succeeded("Succeeded")),
        };

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        state.calls.push(FakeCall::Check {
            batch,
            done: matches!(&result, Ok(status) if status.done),
        });
        result
    }
}
