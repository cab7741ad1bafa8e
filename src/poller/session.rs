use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::options::{PollOptions, RenewalPolicy};
use super::progress::{NoProgress, Progress};
use super::state::TaskState;
use super::StatusSource;
use crate::auth::{AccessToken, TokenIssuer};
use crate::error::{ApiError, Result};

/// Successful end of a poll session
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    /// Terminal state name as reported by the control plane
    pub final_state: String,
    /// Wall-clock time from the first status query to completion
    pub elapsed: Duration,
    /// Status queries issued, including the first
    pub queries: u32,
    pub renewals: u32,
}

/// Per-call bookkeeping; never outlives `await_completion`
struct PollSession {
    started_at: Instant,
    last_renewal_at: Instant,
    renewals: u32,
    queries: u32,
}

impl PollSession {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            last_renewal_at: now,
            renewals: 0,
            queries: 1,
        }
    }

    fn renewal_due(&self, options: &PollOptions, token: &AccessToken) -> bool {
        // A token handed in by the caller may already be old
        let due = self.last_renewal_at.elapsed() >= options.renewal_threshold
            || options.token_needs_renewal(token);
        match options.renewal_policy {
            RenewalPolicy::Once => self.renewals == 0 && due,
            RenewalPolicy::Periodic => due,
        }
    }
}

/// Polls one operation at a time until it is terminal
pub struct OperationPoller {
    source: Arc<dyn StatusSource>,
    issuer: Arc<dyn TokenIssuer>,
    options: PollOptions,
    progress: Box<dyn Progress>,
}

impl OperationPoller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        issuer: Arc<dyn TokenIssuer>,
        options: PollOptions,
    ) -> Self {
        Self {
            source,
            issuer,
            options,
            progress: Box::new(NoProgress),
        }
    }

    /// Report progress to `progress` instead of staying silent
    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Block until `task_id` completes
    ///
    /// `token` is replaced in place whenever a renewal happens, so the caller
    /// keeps using a valid token afterwards.
    pub async fn await_completion(
        &self,
        task_id: &str,
        token: &mut AccessToken,
    ) -> Result<TaskOutcome> {
        let result = self.poll(task_id, token).await;
        self.progress.finished();

        match &result {
            Ok(outcome) => tracing::info!(
                task_id = %task_id,
                elapsed = %format_elapsed(outcome.elapsed),
                queries = outcome.queries,
                renewals = outcome.renewals,
                "Operation completed"
            ),
            Err(e) => tracing::warn!(task_id = %task_id, error = %e, "Operation did not complete"),
        }

        result
    }

    async fn poll(&self, task_id: &str, token: &mut AccessToken) -> Result<TaskOutcome> {
        let mut status = self.source.fetch_status(task_id, token).await?;
        let mut session = PollSession::start();

        tracing::debug!(
            task_id = %task_id,
            state = %status.state_name(),
            "Initial operation state"
        );
        self.progress.started(task_id, status.state_name());

        loop {
            match TaskState::from_status(&status, &self.options) {
                TaskState::Completed => break,
                TaskState::Failed {
                    code,
                    message,
                    message_key,
                } => {
                    return Err(ApiError::TaskFailed {
                        code,
                        message,
                        message_key,
                    })
                }
                TaskState::InProgress { .. } => {}
            }

            self.progress.tick();
            tokio::time::sleep(self.options.interval).await;

            if let Some(deadline) = self.options.deadline {
                let elapsed = session.started_at.elapsed();
                if elapsed >= deadline {
                    return Err(ApiError::PollTimeout {
                        task_id: task_id.to_string(),
                        elapsed,
                    });
                }
            }

            if session.renewal_due(&self.options, token) {
                tracing::info!(
                    task_id = %task_id,
                    token_age_secs = token.age().as_secs(),
                    "Renewing access token mid-poll"
                );
                *token = self.issuer.issue_token().await?;
                session.last_renewal_at = Instant::now();
                session.renewals += 1;
            }

            status = self.source.fetch_status(task_id, token).await?;
            session.queries += 1;
            tracing::trace!(task_id = %task_id, state = %status.state_name(), "Polled operation");
        }

        Ok(TaskOutcome {
            task_id: task_id.to_string(),
            final_state: status.state_name().to_string(),
            elapsed: session.started_at.elapsed(),
            queries: session.queries,
            renewals: session.renewals,
        })
    }
}

/// Render a duration as `MMmin SSsec`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}min {:02}sec", secs / 60, secs % 60)
}
