/// Drives one import run: load, validate, then submit and poll batches in order
///
/// The orchestrator is the single writer of run state. Submissions and polls
/// run as spawned tasks that report back through `RunEvent`s tagged with the
/// run id; the owner feeds those events into `handle_event`. Events from a
/// run that has since been reset are dropped.
use super::batcher::Batcher;
use super::types::{
    FailureReport, FailureStage, ImportSnapshot, ImportState, ValidationIssue, ValidationRules,
};
use super::validation_service::TableValidator;
use crate::modules::deployment::{
    DeployJob, DeploymentClient, DeploymentPoller, DeploymentStatus, DeploymentSubmitter,
    JobHandle, PollError, PollHandle, SubmitError,
};
use crate::modules::notification::{Notification, NotificationSink};
use crate::modules::table::{Batch, Table, TableParser};
use crate::shared::config::AppConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::LogContext;
use crate::{log_debug, log_error, log_info};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Completion report from a spawned submission or poll
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Submitted {
        run_id: Uuid,
        batch_index: usize,
        outcome: Result<JobHandle, SubmitError>,
    },
    StatusUpdate {
        run_id: Uuid,
        batch_index: usize,
        status: DeploymentStatus,
    },
    PollFailed {
        run_id: Uuid,
        batch_index: usize,
        error: PollError,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::Submitted { run_id, .. }
            | RunEvent::StatusUpdate { run_id, .. }
            | RunEvent::PollFailed { run_id, .. } => *run_id,
        }
    }

    pub fn batch_index(&self) -> usize {
        match self {
            RunEvent::Submitted { batch_index, .. }
            | RunEvent::StatusUpdate { batch_index, .. }
            | RunEvent::PollFailed { batch_index, .. } => *batch_index,
        }
    }
}

struct ImportRun {
    id: Uuid,
    table: Arc<Table>,
    /// Fixed when the deployment starts; later selections apply to the next run
    target_type: Option<String>,
    issues: Vec<ValidationIssue>,
    missing_columns: Vec<String>,
    batches: Vec<Batch>,
    jobs: Vec<DeployJob>,
    results: Vec<DeploymentStatus>,
    cancel: CancellationToken,
    active_poll: Option<PollHandle>,
    submitting: bool,
}

impl ImportRun {
    fn new(table: Table, issues: Vec<ValidationIssue>, missing_columns: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            table: Arc::new(table),
            target_type: None,
            issues,
            missing_columns,
            batches: Vec::new(),
            jobs: Vec::new(),
            results: Vec::new(),
            cancel: CancellationToken::new(),
            active_poll: None,
            submitting: false,
        }
    }
}

pub struct ImportOrchestrator {
    submitter: Arc<DeploymentSubmitter>,
    poller: DeploymentPoller,
    validator: TableValidator,
    max_batch_rows: NonZeroUsize,
    preview_rows: usize,
    notifier: Arc<dyn NotificationSink>,
    events: mpsc::UnboundedSender<RunEvent>,
    state: ImportState,
    target_type: Option<String>,
    run: Option<ImportRun>,
}

impl ImportOrchestrator {
    /// Build an orchestrator and the receiver its background tasks report to
    pub fn new(
        client: Arc<dyn DeploymentClient>,
        notifier: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let orchestrator = Self {
            submitter: Arc::new(DeploymentSubmitter::new(client.clone())),
            poller: DeploymentPoller::new(client, config.poll_interval)
                .with_timeout(config.poll_timeout),
            validator: TableValidator::new(ValidationRules::from_config(config)),
            max_batch_rows: config.max_batch_rows,
            preview_rows: config.preview_rows,
            notifier,
            events,
            state: ImportState::Idle,
            target_type: None,
            run: None,
        };
        (orchestrator, receiver)
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn target_type(&self) -> Option<&str> {
        self.target_type.as_deref()
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run.as_ref().map(|run| run.id)
    }

    /// Parse raw text and load the result; a parse failure leaves the orchestrator idle
    pub fn load_raw(&mut self, raw: &str, parser: &dyn TableParser) -> AppResult<Uuid> {
        self.reset();
        match parser.parse(raw) {
            Ok(table) => Ok(self.load_table(table)),
            Err(e) => {
                LogContext::error_with_context(&e, "Failed to parse upload");
                self.notifier.notify(Notification::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Replace any current run with a fresh one for `table` and validate it
    pub fn load_table(&mut self, table: Table) -> Uuid {
        self.reset();
        self.state = ImportState::Parsed;
        log_info!(
            "Loaded table with {} rows and {} columns",
            table.len(),
            table.headers().len()
        );

        let issues = self.validator.validate(&table);
        let missing_columns = self.validator.missing_columns(&table);

        if !missing_columns.is_empty() {
            self.notifier.notify(Notification::warning(format!(
                "Missing required column(s): {}",
                missing_columns.join(", ")
            )));
        }
        if !issues.is_empty() {
            self.notifier.notify(Notification::warning(format!(
                "{} validation issue(s) found; the data can still be deployed",
                issues.len()
            )));
        }

        let run = ImportRun::new(table, issues, missing_columns);
        let run_id = run.id;
        self.run = Some(run);
        self.state = ImportState::Validated;
        run_id
    }

    /// Target type survives resets and reloads; a blank value clears it
    pub fn select_target_type(&mut self, target_type: &str) {
        let target_type = target_type.trim();
        self.target_type = if target_type.is_empty() {
            None
        } else {
            Some(target_type.to_string())
        };
    }

    pub fn can_submit(&self) -> bool {
        self.submit_blocker().is_none()
    }

    fn submit_blocker(&self) -> Option<String> {
        let Some(run) = self.run.as_ref() else {
            return Some("No file loaded".to_string());
        };
        if run.table.is_empty() {
            return Some("The loaded file has no rows".to_string());
        }
        if self.target_type.is_none() {
            return Some("No target type selected".to_string());
        }
        if !run.missing_columns.is_empty() {
            return Some(format!(
                "Missing required column(s): {}",
                run.missing_columns.join(", ")
            ));
        }
        if self.state != ImportState::Validated {
            return Some("A deployment for this file has already started".to_string());
        }
        None
    }

    /// Split the table into batches and submit the first; returns the batch count
    pub fn start_deployment(&mut self) -> AppResult<usize> {
        if let Some(reason) = self.submit_blocker() {
            return Err(AppError::InvalidInput(reason));
        }
        let Some(run) = self.run.as_mut() else {
            return Err(AppError::InvalidInput("No file loaded".to_string()));
        };

        run.target_type = self.target_type.clone();
        run.batches = Batcher::split(&run.table, self.max_batch_rows);
        run.jobs = run
            .batches
            .iter()
            .map(|batch| DeployJob::pending(batch.index, batch.len()))
            .collect();
        let total = run.batches.len();
        log_info!(
            "Starting deployment of {} rows in {} batches (run {})",
            run.table.len(),
            total,
            run.id
        );

        self.submit_batch(0);
        Ok(total)
    }

    fn submit_batch(&mut self, batch_index: usize) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let (Some(batch), Some(target_type)) =
            (run.batches.get(batch_index).cloned(), run.target_type.clone())
        else {
            self.fail(
                batch_index,
                FailureStage::Submit,
                format!("Batch {} has nothing to submit", batch_index + 1),
            );
            return;
        };

        run.submitting = true;
        self.state = ImportState::Deploying { batch_index };
        LogContext::batch_progress(batch_index, run.batches.len(), "submitting");

        let run_id = run.id;
        let submitter = self.submitter.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = submitter.submit(&batch, &target_type).await;
            // A closed channel means the owner is gone
            let _ = events.send(RunEvent::Submitted {
                run_id,
                batch_index,
                outcome,
            });
        });
    }

    /// Apply a background completion to the current run
    pub fn handle_event(&mut self, event: RunEvent) {
        if self.run_id() != Some(event.run_id()) {
            log_debug!("Dropping event for stale run {}", event.run_id());
            return;
        }
        if self.state.batch_index() != Some(event.batch_index()) || !self.state.is_active() {
            log_debug!(
                "Ignoring event for batch {} in state {}",
                event.batch_index(),
                self.state
            );
            return;
        }

        match event {
            RunEvent::Submitted {
                batch_index,
                outcome,
                ..
            } => self.on_submitted(batch_index, outcome),
            RunEvent::StatusUpdate {
                batch_index,
                status,
                ..
            } => self.on_status(batch_index, status),
            RunEvent::PollFailed {
                batch_index, error, ..
            } => self.on_poll_failed(batch_index, error),
        }
    }

    fn on_submitted(&mut self, batch_index: usize, outcome: Result<JobHandle, SubmitError>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.submitting = false;

        let handle = match outcome {
            Ok(handle) => handle,
            Err(error) => {
                if let Some(job) = run.jobs.get_mut(batch_index) {
                    job.mark_submit_failed(error.to_string());
                }
                self.fail(batch_index, FailureStage::Submit, error.to_string());
                return;
            }
        };

        if let Some(job) = run.jobs.get_mut(batch_index) {
            job.mark_polling(handle.clone());
        }
        self.state = ImportState::Polling { batch_index };
        LogContext::batch_progress(batch_index, run.batches.len(), "polling");

        let run_id = run.id;
        let updates = self.events.clone();
        let failures = self.events.clone();
        let poll = self.poller.poll_until_done(
            handle,
            run.cancel.child_token(),
            move |status| {
                let _ = updates.send(RunEvent::StatusUpdate {
                    run_id,
                    batch_index,
                    status,
                });
            },
            move |error| {
                let _ = failures.send(RunEvent::PollFailed {
                    run_id,
                    batch_index,
                    error,
                });
            },
        );
        run.active_poll = Some(poll);
    }

    fn on_status(&mut self, batch_index: usize, status: DeploymentStatus) {
        if !matches!(self.state, ImportState::Polling { .. }) {
            return;
        }
        let Some(run) = self.run.as_mut() else {
            return;
        };

        // One slot per batch: created by its first response, replaced by later ones
        match run.results.get_mut(batch_index) {
            Some(slot) => *slot = status.clone(),
            None => run.results.push(status.clone()),
        }
        if let Some(job) = run.jobs.get_mut(batch_index) {
            job.record_response(status.clone());
        }

        if !status.done {
            return;
        }
        run.active_poll = None;

        if !status.success {
            self.fail(batch_index, FailureStage::Job, status.result);
            return;
        }

        let total = run.batches.len();
        LogContext::batch_progress(batch_index, total, "deployed");
        if batch_index + 1 < total {
            self.submit_batch(batch_index + 1);
        } else {
            log_info!("Import run {} completed: {} batches deployed", run.id, total);
            self.notifier.notify(Notification::info(format!(
                "Deployed {} rows in {} batches",
                run.table.len(),
                total
            )));
            self.state = ImportState::Completed;
        }
    }

    fn on_poll_failed(&mut self, batch_index: usize, error: PollError) {
        if let Some(job) = self
            .run
            .as_mut()
            .and_then(|run| run.jobs.get_mut(batch_index))
        {
            job.mark_failed(error.to_string());
        }
        self.fail(batch_index, FailureStage::Poll, error.to_string());
    }

    fn fail(&mut self, batch_index: usize, stage: FailureStage, message: String) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        run.submitting = false;
        if let Some(poll) = run.active_poll.take() {
            poll.cancel();
        }

        let report = FailureReport {
            batch_index,
            total_batches: run.batches.len(),
            applied_batches: batch_index,
            stage,
            message,
        };
        log_error!("Import run {} failed during {}: {}", run.id, stage, report.message);
        self.notifier.notify(Notification::error(report.summary()));
        self.state = ImportState::Failed(report);
    }

    /// Drop the current run, cancelling any active polling
    ///
    /// The selected target type is kept. A submission already in flight
    /// finishes, but its result is discarded.
    pub fn reset(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.cancel.cancel();
            run.active_poll = None;
            log_info!("Discarded import run {} in state {}", run.id, self.state);
        }
        self.state = ImportState::Idle;
    }

    pub fn snapshot(&self) -> ImportSnapshot {
        let mut snapshot = ImportSnapshot {
            run_id: None,
            state: self.state.clone(),
            table: None,
            issues: Vec::new(),
            missing_columns: Vec::new(),
            target_type: self.target_type.clone(),
            jobs: Vec::new(),
            results: Vec::new(),
            can_submit: self.can_submit(),
            is_submitting: false,
            preview_rows: self.preview_rows,
        };

        if let Some(run) = &self.run {
            snapshot.run_id = Some(run.id);
            snapshot.table = Some(run.table.clone());
            snapshot.issues = run.issues.clone();
            snapshot.missing_columns = run.missing_columns.clone();
            snapshot.jobs = run.jobs.clone();
            snapshot.results = run.results.clone();
            snapshot.is_submitting = run.submitting;
        }
        snapshot
    }
}
