//! Minimal agent that echoes the user's text back as an artifact.
//!
//! Run with `cargo run --example echo_server`, then:
//!
//! ```sh
//! curl -s http://127.0.0.1:8080/ -H 'content-type: application/json' -d '{
//!   "jsonrpc": "2.0", "id": 1, "method": "message/send",
//!   "params": {"message": {"messageId": "m-1", "role": "user",
//!              "parts": [{"kind": "text", "text": "hello"}]}}
//! }'
//! ```

use std::sync::Arc;

use a2a_core::{
    AgentCapabilities, AgentCard, Artifact, ExecutionEvent, PartContent, TaskArtifactUpdateEvent,
    TaskState, TaskStatus, TaskStatusUpdateEvent,
};
use a2a_runtime::{
    AgentExecutor, AppState, EventPublisher, LifecycleEngine, LoggingHook, RequestContext,
    RuntimeError,
};
use async_trait::async_trait;

struct EchoExecutor;

impl EchoExecutor {
    fn inbound_text(ctx: &RequestContext) -> String {
        ctx.message
            .parts
            .iter()
            .filter_map(|part| match &part.content {
                PartContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl AgentExecutor for EchoExecutor {
    async fn execute(
        &self,
        ctx: RequestContext,
        publisher: EventPublisher,
    ) -> Result<(), RuntimeError> {
        publisher
            .publish(ExecutionEvent::StatusUpdate(TaskStatusUpdateEvent {
                task_id: ctx.task_id.clone(),
                context_id: ctx.context_id.clone(),
                status: TaskStatus::new(TaskState::Working),
                is_final: false,
                metadata: None,
            }))
            .await?;

        let text = Self::inbound_text(&ctx);
        publisher
            .publish(ExecutionEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: ctx.task_id.clone(),
                context_id: ctx.context_id.clone(),
                artifact: Artifact::text("echo", text),
                append: false,
                last_chunk: true,
                metadata: None,
            }))
            .await?;

        publisher
            .publish(ExecutionEvent::StatusUpdate(TaskStatusUpdateEvent {
                task_id: ctx.task_id.clone(),
                context_id: ctx.context_id.clone(),
                status: TaskStatus::new(TaskState::Completed),
                is_final: true,
                metadata: None,
            }))
            .await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,a2a_runtime=debug".into()),
        )
        .init();

    let card = AgentCard::new("Echo Agent").with_capabilities(AgentCapabilities {
        streaming: true,
        push_notifications: true,
    });

    let engine = Arc::new(
        LifecycleEngine::new(Arc::new(EchoExecutor))
            .with_push_dispatcher(a2a_runtime::PushDispatcher::new()),
    );
    let state = AppState::new(engine, card).with_hook(Arc::new(LoggingHook));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    a2a_runtime::serve(listener, state).await
}
