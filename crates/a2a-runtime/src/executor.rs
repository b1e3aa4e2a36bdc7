use a2a_core::{Message, Task};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::bus::EventPublisher;
use crate::error::RuntimeError;

/// Everything an agent gets to see for one turn: the inbound message, the
/// task ids the engine resolved for it, and the stored task as of the start
/// of the turn.
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
    pub current_task: Option<Task>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        message: Message,
        current_task: Option<Task>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            message,
            current_task,
            cancel,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the task is canceled. Long-running executions should
    /// select on this and stop publishing.
    pub async fn canceled(&self) {
        self.cancel.cancelled().await
    }
}

/// The agent side of the engine: given a turn context, publish execution
/// events until the turn ends with a terminal or interrupt status.
#[async_trait]
pub trait AgentExecutor: Send + Sync + 'static {
    async fn execute(
        &self,
        ctx: RequestContext,
        publisher: EventPublisher,
    ) -> Result<(), RuntimeError>;

    /// Cleanup hook invoked on `tasks/cancel`, after the cancellation token
    /// fires and before the engine records the canceled status.
    async fn cancel(&self, task_id: &str) -> Result<(), RuntimeError> {
        let _ = task_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_core::Role;

    #[test]
    fn test_context_reports_cancellation() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(
            "t-1",
            "ctx-1",
            Message::text("m-1", Role::User, "hi"),
            None,
            token.clone(),
        );

        assert!(!ctx.is_canceled());
        token.cancel();
        assert!(ctx.is_canceled());
    }

    #[tokio::test]
    async fn test_canceled_future_resolves() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(
            "t-1",
            "ctx-1",
            Message::text("m-1", Role::User, "hi"),
            None,
            token.clone(),
        );

        let wait = tokio::spawn(async move { ctx.canceled().await });
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), wait)
            .await
            .expect("cancellation should resolve")
            .unwrap();
    }
}
