// Error handling module
// Defines error types surfaced by the credential manager, catalog and poller

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to CSP or the VMC control plane
#[derive(Error, Debug)]
pub enum ApiError {
    /// Token issuance or renewal failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Network failure or unparseable response body
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Control plane answered with a non-success status
    #[error("VMC API error: {status} - {message}")]
    RemoteError { status: u16, message: String },

    /// Remote task reached its terminal failure state
    #[error("Task failed: {code} - {message} (message key: {message_key})")]
    TaskFailed {
        code: String,
        message: String,
        message_key: String,
    },

    /// Overall poll deadline elapsed before the task became terminal
    #[error("Task {task_id} still running after {}s", .elapsed.as_secs())]
    PollTimeout { task_id: String, elapsed: Duration },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operator input did not resolve to anything usable
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Process exit code reported by the binary for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::TaskFailed { .. } => 2,
            ApiError::AuthError(_) => 3,
            ApiError::TransportError(_) | ApiError::RemoteError { .. } => 4,
            ApiError::PollTimeout { .. } => 5,
            ApiError::ConfigError(_) | ApiError::ValidationError(_) => 64,
            ApiError::Internal(_) => 1,
        }
    }

    /// Task failures are printed in full by the command that waited on them
    pub fn already_reported(&self) -> bool {
        matches!(self, ApiError::TaskFailed { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::TransportError(format!("{} (kind: {})", e, error_kind(&e)))
    }
}

/// Categorize a reqwest error for logs
pub fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::AuthError("no access_token".to_string());
        assert_eq!(err.to_string(), "Authentication failed: no access_token");

        let err = ApiError::RemoteError {
            status: 404,
            message: "group not found".to_string(),
        };
        assert_eq!(err.to_string(), "VMC API error: 404 - group not found");
    }

    #[test]
    fn test_task_failed_message_carries_all_fields() {
        let err = ApiError::TaskFailed {
            code: "E1".to_string(),
            message: "boom".to_string(),
            message_key: "k".to_string(),
        };
        assert_eq!(err.to_string(), "Task failed: E1 - boom (message key: k)");
    }

    #[test]
    fn test_poll_timeout_message() {
        let err = ApiError::PollTimeout {
            task_id: "task-1".to_string(),
            elapsed: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "Task task-1 still running after 90s");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("Something went wrong"));
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            ApiError::TaskFailed {
                code: String::new(),
                message: String::new(),
                message_key: String::new(),
            }
            .exit_code(),
            2
        );
        assert_eq!(ApiError::AuthError("x".into()).exit_code(), 3);
        assert_eq!(ApiError::TransportError("x".into()).exit_code(), 4);
        assert_eq!(
            ApiError::RemoteError {
                status: 500,
                message: String::new()
            }
            .exit_code(),
            4
        );
        assert_eq!(ApiError::ConfigError("x".into()).exit_code(), 64);
        assert_eq!(ApiError::Internal(anyhow::anyhow!("x")).exit_code(), 1);
    }

    #[test]
    fn test_only_task_failures_are_already_reported() {
        let failed = ApiError::TaskFailed {
            code: "E1".to_string(),
            message: "boom".to_string(),
            message_key: "k".to_string(),
        };
        assert!(failed.already_reported());
        assert!(!ApiError::AuthError("x".into()).already_reported());
        assert!(!ApiError::PollTimeout {
            task_id: "t".into(),
            elapsed: Duration::from_secs(1),
        }
        .already_reported());
    }
}
