use crate::modules::data_import::domain::services::import_components::{
    ImportOrchestrator, ImportSnapshot, RunEvent,
};
use crate::modules::deployment::DeploymentClient;
use crate::modules::notification::NotificationSink;
use crate::modules::table::{Table, TableParser};
use crate::shared::config::AppConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_info};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

const COMMAND_BUFFER: usize = 32;

enum ImportCommand {
    LoadCsv {
        raw: String,
        reply: oneshot::Sender<AppResult<Uuid>>,
    },
    LoadTable {
        table: Table,
        reply: oneshot::Sender<Uuid>,
    },
    SelectTargetType {
        target_type: String,
        reply: oneshot::Sender<()>,
    },
    StartDeployment {
        reply: oneshot::Sender<AppResult<usize>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Import service - owns the orchestrator on a dedicated task
///
/// Commands from any number of `ImportHandle`s and completions from
/// background submissions and polls are applied one at a time, so run state
/// has a single writer. Every change is published as an `ImportSnapshot`.
pub struct ImportService {
    orchestrator: ImportOrchestrator,
    parser: Arc<dyn TableParser>,
    commands: mpsc::Receiver<ImportCommand>,
    events: mpsc::UnboundedReceiver<RunEvent>,
    snapshots: watch::Sender<ImportSnapshot>,
}

impl ImportService {
    /// Spawn the service task and return a handle to it
    pub fn start(
        client: Arc<dyn DeploymentClient>,
        parser: Arc<dyn TableParser>,
        notifier: Arc<dyn NotificationSink>,
        config: &AppConfig,
    ) -> ImportHandle {
        let (orchestrator, events) = ImportOrchestrator::new(client, notifier, config);
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots, snapshot_rx) = watch::channel(orchestrator.snapshot());

        let service = Self {
            orchestrator,
            parser,
            commands,
            events,
            snapshots,
        };
        tokio::spawn(service.run());

        ImportHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self) {
        log_info!("Import service started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        log_debug!("All import handles dropped");
                        break;
                    };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                Some(event) = self.events.recv() => {
                    self.orchestrator.handle_event(event);
                    self.publish();
                }
            }
        }

        self.orchestrator.reset();
        self.publish();
        log_info!("Import service stopped");
    }

    /// Apply one command, publishing the new snapshot before replying
    fn handle_command(&mut self, command: ImportCommand) -> ControlFlow<()> {
        match command {
            ImportCommand::LoadCsv { raw, reply } => {
                let result = self.orchestrator.load_raw(&raw, self.parser.as_ref());
                self.publish();
                let _ = reply.send(result);
            }
            ImportCommand::LoadTable { table, reply } => {
                let run_id = self.orchestrator.load_table(table);
                self.publish();
                let _ = reply.send(run_id);
            }
            ImportCommand::SelectTargetType { target_type, reply } => {
                self.orchestrator.select_target_type(&target_type);
                self.publish();
                let _ = reply.send(());
            }
            ImportCommand::StartDeployment { reply } => {
                let result = self.orchestrator.start_deployment();
                self.publish();
                let _ = reply.send(result);
            }
            ImportCommand::Reset { reply } => {
                self.orchestrator.reset();
                self.publish();
                let _ = reply.send(());
            }
            ImportCommand::Shutdown { reply } => {
                self.orchestrator.reset();
                self.publish();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.orchestrator.snapshot());
    }
}

/// Cloneable client of a running `ImportService`
#[derive(Clone)]
pub struct ImportHandle {
    commands: mpsc::Sender<ImportCommand>,
    snapshots: watch::Receiver<ImportSnapshot>,
}

impl ImportHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ImportCommand,
    ) -> AppResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| service_stopped())?;
        response.await.map_err(|_| service_stopped())
    }

    /// Parse and load a CSV upload, replacing the current run
    pub async fn load_csv(&self, raw: impl Into<String>) -> AppResult<Uuid> {
        let raw = raw.into();
        self.request(|reply| ImportCommand::LoadCsv { raw, reply })
            .await?
    }

    pub async fn load_table(&self, table: Table) -> AppResult<Uuid> {
        self.request(|reply| ImportCommand::LoadTable { table, reply })
            .await
    }

    pub async fn select_target_type(&self, target_type: impl Into<String>) -> AppResult<()> {
        let target_type = target_type.into();
        self.request(|reply| ImportCommand::SelectTargetType { target_type, reply })
            .await
    }

    /// Begin submitting batches; resolves once the first submission is scheduled
    pub async fn start_deployment(&self) -> AppResult<usize> {
        self.request(|reply| ImportCommand::StartDeployment { reply })
            .await?
    }

    pub async fn reset(&self) -> AppResult<()> {
        self.request(|reply| ImportCommand::Reset { reply }).await
    }

    /// Stop the service task, cancelling any active run
    pub async fn shutdown(&self) -> AppResult<()> {
        self.request(|reply| ImportCommand::Shutdown { reply }).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ImportSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until the current run completes or fails
    pub async fn wait_for_terminal(&self) -> AppResult<ImportSnapshot> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| snapshot.state.is_terminal())
            .await
            .map_err(|_| service_stopped())?;
        Ok(snapshot.clone())
    }
}

fn service_stopped() -> AppError {
    AppError::InternalError("Import service is not running".to_string())
}
