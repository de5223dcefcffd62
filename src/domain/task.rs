use serde::{Deserialize, Serialize};

/// Offline download task state, numbered as the backend reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Canceling,
    Canceled,
    Errored,
    Failing,
    Failed,
    WaitingRetry,
    BeforeRetry,
    Unknown,
}

impl TaskStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Canceling,
            4 => Self::Canceled,
            5 => Self::Errored,
            6 => Self::Failing,
            7 => Self::Failed,
            8 => Self::WaitingRetry,
            9 => Self::BeforeRetry,
            _ => Self::Unknown,
        }
    }

    /// No further progress will be made on the task.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Canceled | Self::Errored | Self::Failed
        )
    }
}

/// Handle to a backend-side offline download task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub url: String,
    pub status: TaskStatus,
    pub backend_id: String,
    pub progress: f64,
    pub error: Option<String>,
}

impl TaskHandle {
    pub fn new(backend_id: impl Into<String>, url: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            url: url.into(),
            status,
            backend_id: backend_id.into(),
            progress: 0.0,
            error: None,
        }
    }
}
