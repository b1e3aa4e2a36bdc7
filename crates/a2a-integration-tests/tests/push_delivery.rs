//! Webhook delivery: a local HTTP receiver stands in for the client's
//! notification endpoint.

use std::sync::Arc;
use std::time::Duration;

use a2a_core::{
    ExecutionEvent, Message, MessageSendConfiguration, MessageSendParams, PushNotificationConfig,
    Role, TaskState, TaskStatus, TaskStatusUpdateEvent,
};
use a2a_runtime::{
    AgentExecutor, EventPublisher, LifecycleEngine, PushDispatcher, RequestContext, RuntimeError,
    SendOutcome,
};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Clone)]
struct Received {
    tx: mpsc::Sender<(HeaderMap, serde_json::Value)>,
}

async fn webhook(
    State(state): State<Received>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let _ = state.tx.send((headers, body)).await;
    StatusCode::OK
}

/// Bind a throwaway webhook receiver and return its URL plus the delivery
/// channel.
async fn spawn_receiver() -> (String, mpsc::Receiver<(HeaderMap, serde_json::Value)>) {
    let (tx, rx) = mpsc::channel(16);
    let app = Router::new()
        .route("/hook", post(webhook))
        .with_state(Received { tx });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), rx)
}

struct TwoStepExecutor;

#[async_trait]
impl AgentExecutor for TwoStepExecutor {
    async fn execute(
        &self,
        ctx: RequestContext,
        publisher: EventPublisher,
    ) -> Result<(), RuntimeError> {
        for (state, is_final) in [(TaskState::Working, false), (TaskState::Completed, true)] {
            publisher
                .publish(ExecutionEvent::StatusUpdate(TaskStatusUpdateEvent {
                    task_id: ctx.task_id.clone(),
                    context_id: ctx.context_id.clone(),
                    status: TaskStatus::new(state),
                    is_final,
                    metadata: None,
                }))
                .await?;
        }
        Ok(())
    }
}

fn params_with_push(config: PushNotificationConfig) -> MessageSendParams {
    MessageSendParams {
        message: Message::text("m-1", Role::User, "notify me"),
        configuration: Some(MessageSendConfiguration {
            push_notification_config: Some(config),
            ..Default::default()
        }),
    }
}

async fn recv_with_deadline(
    rx: &mut mpsc::Receiver<(HeaderMap, serde_json::Value)>,
) -> (HeaderMap, serde_json::Value) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("webhook should be called")
        .expect("receiver channel open")
}

#[tokio::test]
async fn test_status_changes_delivered_to_webhook() {
    let (url, mut rx) = spawn_receiver().await;
    let engine = Arc::new(
        LifecycleEngine::new(Arc::new(TwoStepExecutor)).with_push_dispatcher(PushDispatcher::new()),
    );

    let outcome = engine
        .send_message(params_with_push(PushNotificationConfig {
            url,
            token: None,
            authentication: None,
        }))
        .await
        .unwrap();
    let task = match outcome {
        SendOutcome::Task(task) => task,
        other => panic!("expected task outcome, got {other:?}"),
    };

    // One notification per status change. Deliveries are fired from
    // separate tasks, so don't assume arrival order.
    let mut states = Vec::new();
    for _ in 0..2 {
        let (_, body) = recv_with_deadline(&mut rx).await;
        assert_eq!(body["id"], task.id.as_str());
        states.push(body["status"]["state"].as_str().unwrap().to_string());
    }
    states.sort();
    assert_eq!(states, vec!["completed", "working"]);
}

#[tokio::test]
async fn test_webhook_receives_token_header() {
    let (url, mut rx) = spawn_receiver().await;
    let engine = Arc::new(
        LifecycleEngine::new(Arc::new(TwoStepExecutor)).with_push_dispatcher(PushDispatcher::new()),
    );

    engine
        .send_message(params_with_push(PushNotificationConfig {
            url,
            token: Some("shared-secret".into()),
            authentication: None,
        }))
        .await
        .unwrap();

    let (headers, _) = recv_with_deadline(&mut rx).await;
    assert_eq!(
        headers.get("x-a2a-notification-token").unwrap(),
        "shared-secret"
    );
}

#[tokio::test]
async fn test_no_webhook_without_registration() {
    let (_url, mut rx) = spawn_receiver().await;
    let engine = Arc::new(
        LifecycleEngine::new(Arc::new(TwoStepExecutor)).with_push_dispatcher(PushDispatcher::new()),
    );

    engine
        .send_message(MessageSendParams {
            message: Message::text("m-1", Role::User, "quiet"),
            configuration: None,
        })
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(result.is_err(), "no notification should be delivered");
}
