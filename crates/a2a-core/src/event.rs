use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::message::Message;
use crate::task::{Task, TaskStatus};

/// Status update published during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    /// True on the last event of an execution; nothing follows it.
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Artifact chunk published during execution. `append` extends the parts of
/// an existing artifact with the same id; otherwise the artifact is replaced
/// (or added).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub last_chunk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Event produced by an agent execution, discriminated by a `kind` field on
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExecutionEvent {
    /// Full task snapshot (sent first on a stream).
    Task(Task),
    /// Terminal single-turn reply with no task tracking.
    Message(Message),
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl ExecutionEvent {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            ExecutionEvent::Task(t) => Some(&t.id),
            ExecutionEvent::Message(m) => m.task_id.as_deref(),
            ExecutionEvent::StatusUpdate(e) => Some(&e.task_id),
            ExecutionEvent::ArtifactUpdate(e) => Some(&e.task_id),
        }
    }

    /// True if the task reached a terminal state through this event.
    pub fn is_terminal(&self) -> bool {
        match self {
            ExecutionEvent::Task(t) => t.status.state.is_terminal(),
            ExecutionEvent::Message(_) => true,
            ExecutionEvent::StatusUpdate(e) => e.is_final || e.status.state.is_terminal(),
            ExecutionEvent::ArtifactUpdate(_) => false,
        }
    }

    /// True if this event ends the current turn: terminal events, and
    /// interrupt statuses such as `input-required` where execution pauses
    /// until the client supplies more input.
    pub fn is_turn_end(&self) -> bool {
        match self {
            ExecutionEvent::StatusUpdate(e) => {
                e.is_final || e.status.state.is_terminal() || e.status.state.is_interrupt()
            }
            other => other.is_terminal(),
        }
    }
}
