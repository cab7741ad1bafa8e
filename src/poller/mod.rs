// Operation poller
// Waits for asynchronous VMC operations to reach a terminal state,
// renewing the CSP access token before it expires

mod options;
mod progress;
mod session;
mod state;

use async_trait::async_trait;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::models::operation::OperationStatus;

pub use options::{PollOptions, RenewalPolicy};
pub use progress::{DotProgress, NoProgress, Progress};
pub use session::{format_elapsed, OperationPoller, TaskOutcome};
pub use state::TaskState;

/// Source of operation status documents
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of `task_id`
    async fn fetch_status(&self, task_id: &str, token: &AccessToken) -> Result<OperationStatus>;
}
