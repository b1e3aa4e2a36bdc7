use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::message::Message;

/// Task lifecycle states.
///
/// Legal transitions: `submitted → working → {input-required ⇄ working}
/// → {completed | failed | canceled | rejected}`. The four end states are
/// terminal: no further transition is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
    Rejected,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
        )
    }

    /// Pause states: the task is waiting on the client and resumes on the
    /// next inbound message.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, TaskState::InputRequired)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// RFC 3339 timestamp, monotonic non-decreasing per task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: None,
        }
    }
}

/// Server-tracked unit of work spanning one or more request/response turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(TaskState::Submitted),
            history: None,
            artifacts: None,
            metadata: None,
        }
    }

    /// Read-time projection keeping only the trailing `limit` history
    /// messages in chronological order. `None` or a non-positive limit
    /// returns the full history. Never destructive.
    pub fn with_history_trimmed(mut self, limit: Option<i32>) -> Self {
        let limit = match limit {
            Some(n) if n > 0 => n as usize,
            _ => return self,
        };
        if let Some(history) = self.history.as_mut() {
            if history.len() > limit {
                history.drain(..history.len() - limit);
            }
        }
        self
    }
}
