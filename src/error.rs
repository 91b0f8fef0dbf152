//! Error taxonomy shared by the client, the task pipeline and the nodes.

use thiserror::Error;

pub type ViduResult<T> = Result<T, ViduError>;

#[derive(Debug, Error)]
pub enum ViduError {
    /// Missing or invalid credentials / base address.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The API answered with a non-success status.
    #[error("API request failed (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("image upload failed: {0}")]
    Upload(String),

    #[error("task submission failed: {0}")]
    Submission(String),

    #[error("task {task_id} failed with error code {err_code}")]
    TaskFailed { task_id: String, err_code: String },

    #[error("task {task_id} polling timed out after {timeout_secs}s")]
    Timeout { task_id: String, timeout_secs: u64 },

    #[error("invalid input: {0}")]
    Validation(String),

    /// Success status, but the body is not what the endpoint promises.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("task {task_id} interrupted")]
    Interrupted { task_id: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViduError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Short tag used in logs and host renderings.
    pub fn kind(&self) -> &'static str {
        match self {
            ViduError::Configuration(_) => "configuration",
            ViduError::Api { .. } => "api",
            ViduError::Network(_) => "network",
            ViduError::Upload(_) => "upload",
            ViduError::Submission(_) => "submission",
            ViduError::TaskFailed { .. } => "task_failed",
            ViduError::Timeout { .. } => "timeout",
            ViduError::Validation(_) => "validation",
            ViduError::InvalidResponse(_) => "invalid_response",
            ViduError::Interrupted { .. } => "interrupted",
            ViduError::Io(_) => "io",
        }
    }
}
