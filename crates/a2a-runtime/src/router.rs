use std::sync::Arc;

use a2a_core::AgentCard;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;

use crate::engine::LifecycleEngine;
use crate::hooks::RequestHook;
use crate::rpc::handle_jsonrpc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub card: Arc<AgentCard>,
    pub hooks: Vec<Arc<dyn RequestHook>>,
}

impl AppState {
    pub fn new(engine: Arc<LifecycleEngine>, card: AgentCard) -> Self {
        Self {
            engine,
            card: Arc::new(card),
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }
}

/// JSON-RPC at `POST /`, the agent card at its well-known path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_jsonrpc))
        .route("/.well-known/agent-card.json", get(serve_agent_card))
        .with_state(state)
}

/// The card is meant to be fetched cross-origin by browser-based clients.
async fn serve_agent_card(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(state.card.as_ref().clone()),
    )
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, create_router(state)).await
}
