/// Failure taxonomy for submitting and polling deployments
use std::time::Duration;
use thiserror::Error;

/// Shown when the service accepts an upsert call but hands back no handle
pub const UNKNOWN_FAILURE_HINT: &str = "Failed to schedule deploy. If your CSV file is very big (more than 500 rows) try to split it in smaller chunks and try again";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Deployment request failed: {0}")]
    Transport(String),

    #[error("{}", UNKNOWN_FAILURE_HINT)]
    UnknownFailure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Deployment status check failed: {0}")]
    Transport(String),

    #[error("Deployment did not finish within {}s", .elapsed.as_secs())]
    TimedOut { elapsed: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_failure_message_carries_hint() {
        let err = SubmitError::UnknownFailure;
        assert_eq!(err.to_string(), UNKNOWN_FAILURE_HINT);
        assert!(!SubmitError::Transport("refused".into())
            .to_string()
            .contains("smaller chunks"));
    }

    #[test]
    fn test_timeout_message() {
        let err = PollError::TimedOut {
            elapsed: Duration::from_secs(600),
        };
        assert_eq!(err.to_string(), "Deployment did not finish within 600s");
    }
}
