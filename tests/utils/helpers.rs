/// Test helper functions and service builders
use super::fake_client::FakeDeploymentClient;
use metaload_lib::modules::data_import::{ImportHandle, ImportService};
use metaload_lib::modules::notification::{ChannelNotificationSink, Notification};
use metaload_lib::modules::table::CsvTableParser;
use metaload_lib::shared::config::AppConfig;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const TARGET_TYPE: &str = "Loader_Setting__mdt";

pub fn test_config(max_batch_rows: usize) -> AppConfig {
    AppConfig {
        max_batch_rows: NonZeroUsize::new(max_batch_rows).unwrap(),
        poll_interval: Duration::from_millis(2000),
        poll_timeout: Some(Duration::from_secs(600)),
        ..AppConfig::default()
    }
}

pub struct TestPipeline {
    pub handle: ImportHandle,
    pub client: Arc<FakeDeploymentClient>,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

/// Start an import service backed by `client`
pub fn start_pipeline(client: FakeDeploymentClient, config: &AppConfig) -> TestPipeline {
    let client = Arc::new(client);
    let (sink, notifications) = ChannelNotificationSink::new();
    let handle = ImportService::start(
        client.clone(),
        Arc::new(CsvTableParser::new()),
        Arc::new(sink),
        config,
    );

    TestPipeline {
        handle,
        client,
        notifications,
    }
}

/// Drain every notification received so far
pub fn drain(notifications: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        received.push(notification);
    }
    received
}
