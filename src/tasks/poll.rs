use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ViduError, ViduResult};
use crate::vidu::types::{Creation, TaskState};
use crate::vidu::ViduClient;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: POLL_TIMEOUT,
        }
    }
}

/// Query the task until it succeeds, fails or runs out of time.
///
/// If `cancel` fires while waiting, one best-effort cancel request is sent
/// for the remote task and `ViduError::Interrupted` is returned.
pub async fn wait_for_completion(
    client: &ViduClient,
    task_id: &str,
    poll: &PollConfig,
    cancel: &CancellationToken,
) -> ViduResult<Vec<Creation>> {
    info!(task_id, "polling task status");
    let start = Instant::now();

    loop {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(interrupt(client, task_id).await),
            status = client.get_creations(task_id) => status?,
        };

        match status.state {
            Some(TaskState::Success) => {
                info!(task_id, elapsed_secs = start.elapsed().as_secs(), "task succeeded");
                return Ok(status.creations.unwrap_or_default());
            }
            Some(TaskState::Failed) => {
                return Err(ViduError::TaskFailed {
                    task_id: task_id.to_string(),
                    err_code: status.err_code(),
                });
            }
            Some(TaskState::Pending) => {
                info!(task_id, "task still pending");
            }
            None => {
                warn!(task_id, "poll returned no state");
            }
        }

        // No point sleeping if the next query would land past the deadline.
        if start.elapsed() + poll.interval > poll.timeout {
            return Err(ViduError::Timeout {
                task_id: task_id.to_string(),
                timeout_secs: poll.timeout.as_secs(),
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(interrupt(client, task_id).await),
            _ = sleep(poll.interval) => {}
        }
    }
}

async fn interrupt(client: &ViduClient, task_id: &str) -> ViduError {
    warn!(task_id, "interrupted while polling, cancelling remote task");
    client.cancel_task(task_id).await;
    ViduError::Interrupted {
        task_id: task_id.to_string(),
    }
}
