/// Background status polling for one scheduled deployment
///
/// The loop sleeps for the poll interval, then issues a single status call and
/// waits for it to resolve before the next tick is scheduled, so at most one
/// call per handle is ever outstanding. It stops on the first terminal
/// response, the first error, cancellation, or when the optional time bound
/// elapses.
use crate::modules::deployment::domain::{DeploymentClient, DeploymentStatus, JobHandle, PollError};
use crate::{log_debug, log_info, log_warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Done,
    Failed,
    Cancelled,
}

/// Handle to a running polling loop
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Stop the loop; no further status calls are issued after this returns
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn join(self) -> PollOutcome {
        self.task.await.unwrap_or(PollOutcome::Cancelled)
    }
}

#[derive(Clone)]
pub struct DeploymentPoller {
    client: Arc<dyn DeploymentClient>,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl DeploymentPoller {
    pub fn new(client: Arc<dyn DeploymentClient>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            max_duration: None,
        }
    }

    /// Give up with `PollError::TimedOut` once `max_duration` has elapsed
    pub fn with_timeout(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Spawn the polling loop for `handle`
    ///
    /// `on_update` sees every response, including the terminal one.
    /// `on_error` is called at most once, and never after `on_update` has
    /// seen a done response.
    pub fn poll_until_done<U, E>(
        &self,
        handle: JobHandle,
        cancel: CancellationToken,
        on_update: U,
        on_error: E,
    ) -> PollHandle
    where
        U: FnMut(DeploymentStatus) + Send + 'static,
        E: FnOnce(PollError) + Send + 'static,
    {
        let task = tokio::spawn(run_loop(
            self.client.clone(),
            handle,
            self.interval,
            self.max_duration,
            cancel.clone(),
            on_update,
            on_error,
        ));

        PollHandle { cancel, task }
    }
}

async fn run_loop<U, E>(
    client: Arc<dyn DeploymentClient>,
    handle: JobHandle,
    interval: Duration,
    max_duration: Option<Duration>,
    cancel: CancellationToken,
    mut on_update: U,
    on_error: E,
) -> PollOutcome
where
    U: FnMut(DeploymentStatus) + Send + 'static,
    E: FnOnce(PollError) + Send + 'static,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;
    log_debug!("Polling deployment {} every {:?}", handle, interval);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_debug!("Polling for {} cancelled after {} checks", handle, attempts);
                return PollOutcome::Cancelled;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if let Some(max) = max_duration {
            let elapsed = started.elapsed();
            if elapsed >= max {
                log_warn!("Deployment {} still running after {:?}, giving up", handle, elapsed);
                on_error(PollError::TimedOut { elapsed });
                return PollOutcome::Failed;
            }
        }

        // In-flight calls are allowed to finish; cancellation is observed between ticks
        attempts += 1;
        match client.check_deployment(&handle).await {
            Ok(status) => {
                let done = status.done;
                on_update(status);
                if done {
                    log_info!("Deployment {} finished after {} checks", handle, attempts);
                    return PollOutcome::Done;
                }
            }
            Err(e) => {
                log_warn!("Status check for {} failed: {}", handle, e);
                on_error(PollError::Transport(e.to_string()));
                return PollOutcome::Failed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::deployment::domain::client::MockDeploymentClient;
    use crate::shared::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_done() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut mock = MockDeploymentClient::new();
        mock.expect_check_deployment().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Ok(DeploymentStatus::in_progress())
            } else {
                Ok(DeploymentStatus::succeeded("Succeeded"))
            }
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let poller = DeploymentPoller::new(Arc::new(mock), Duration::from_millis(2000));
        let handle = poller.poll_until_done(
            JobHandle::new("0Af1"),
            CancellationToken::new(),
            move |status| sink.lock().unwrap().push(status),
            |err| panic!("unexpected poll error: {}", err),
        );

        assert_eq!(handle.join().await, PollOutcome::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].done && seen[2].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_reported_once() {
        let mut mock = MockDeploymentClient::new();
        mock.expect_check_deployment()
            .times(1)
            .returning(|_| Err(AppError::ApiError("HTTP 500".into())));

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let poller = DeploymentPoller::new(Arc::new(mock), Duration::from_millis(2000));
        let handle = poller.poll_until_done(
            JobHandle::new("0Af1"),
            CancellationToken::new(),
            |_| panic!("no update expected"),
            move |err| sink.lock().unwrap().push(err),
        );

        assert_eq!(handle.join().await, PollOutcome::Failed);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], PollError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_issues_no_calls() {
        let mut mock = MockDeploymentClient::new();
        mock.expect_check_deployment().times(0);

        let poller = DeploymentPoller::new(Arc::new(mock), Duration::from_millis(2000));
        let handle = poller.poll_until_done(
            JobHandle::new("0Af1"),
            CancellationToken::new(),
            |_| {},
            |_| {},
        );
        handle.cancel();

        assert!(handle.is_cancelled());
        assert_eq!(handle.join().await, PollOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let mut mock = MockDeploymentClient::new();
        mock.expect_check_deployment()
            .returning(|_| Ok(DeploymentStatus::in_progress()));

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let poller = DeploymentPoller::new(Arc::new(mock), Duration::from_secs(2))
            .with_timeout(Some(Duration::from_secs(10)));
        let handle = poller.poll_until_done(
            JobHandle::new("0Af1"),
            CancellationToken::new(),
            |_| {},
            move |err| sink.lock().unwrap().push(err),
        );

        assert_eq!(handle.join().await, PollOutcome::Failed);
        let errors = errors.lock().unwrap();
        assert!(matches!(errors[0], PollError::TimedOut { elapsed } if elapsed >= Duration::from_secs(10)));
    }
}
