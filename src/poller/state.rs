use super::options::PollOptions;
use crate::models::operation::OperationStatus;

/// Where a remote task stands, as far as the poller is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Completed,
    Failed {
        code: String,
        message: String,
        message_key: String,
    },
    /// Any name that is not terminal, including unknown ones
    InProgress { name: String },
}

impl TaskState {
    /// Map a status document onto a task state
    pub fn from_status(status: &OperationStatus, options: &PollOptions) -> Self {
        let name = status.state_name();
        if options.is_completed(name) {
            TaskState::Completed
        } else if options.is_failed(name) {
            TaskState::Failed {
                code: status.error_code().to_string(),
                message: status.error_message().to_string(),
                message_key: status.message_key().to_string(),
            }
        } else {
            TaskState::InProgress {
                name: name.to_string(),
            }
        }
    }
}
