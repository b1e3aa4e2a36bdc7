use a2a_core::{
    ErrorCode, JsonRpcRequest, JsonRpcResponse, MessageSendParams, ProtocolError,
    RequestId, TaskIdParams, TaskPushConfigParams, TaskQueryParams,
};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::bus::EventStream;
use crate::error::RuntimeError;
use crate::router::AppState;
use crate::sse::sse_response;

enum RpcReply {
    Value(serde_json::Value),
    Stream(EventStream),
}

/// Single JSON-RPC endpoint. Errors are JSON-RPC error responses with HTTP
/// 200; streaming methods answer with an SSE body instead of a JSON one.
/// The body is parsed by hand so malformed JSON maps to the reserved
/// ParseError code with a null id rather than a bare HTTP rejection.
pub async fn handle_jsonrpc(State(state): State<AppState>, body: String) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(_) => {
            return Json(JsonRpcResponse::error(
                RequestId::Null,
                ErrorCode::ParseError.into(),
            ))
            .into_response();
        }
    };
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::error(id, ErrorCode::InvalidRequest.into()))
            .into_response();
    }

    for hook in &state.hooks {
        if let Err(err) = hook.before(&request.method, request.params.as_ref()).await {
            let wire: ProtocolError = (&err).into();
            return Json(JsonRpcResponse::error(id, wire)).into_response();
        }
    }

    let reply = dispatch(&state, &request).await;
    let error = match &reply {
        Ok(_) => None,
        Err(err) => Some(ProtocolError::from(err)),
    };
    for hook in &state.hooks {
        hook.after(&request.method, error.as_ref()).await;
    }

    match reply {
        Ok(RpcReply::Value(value)) => {
            Json(JsonRpcResponse::success(id, value)).into_response()
        }
        Ok(RpcReply::Stream(stream)) => sse_response(id, stream),
        Err(err) => {
            let wire: ProtocolError = (&err).into();
            Json(JsonRpcResponse::error(id, wire)).into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: &JsonRpcRequest) -> Result<RpcReply, RuntimeError> {
    match request.method.as_str() {
        "message/send" => {
            let params: MessageSendParams = parse_params(request)?;
            gate_push_config(state, &params)?;
            let outcome = state.engine.send_message(params).await?;
            Ok(RpcReply::Value(serde_json::to_value(outcome)?))
        }
        "message/stream" => {
            require_streaming(state)?;
            let params: MessageSendParams = parse_params(request)?;
            gate_push_config(state, &params)?;
            let stream = state.engine.stream_message(params).await?;
            Ok(RpcReply::Stream(stream))
        }
        "tasks/get" => {
            let params: TaskQueryParams = parse_params(request)?;
            let task = state
                .engine
                .get_task(&params.id, params.history_length)
                .await?;
            Ok(RpcReply::Value(serde_json::to_value(task)?))
        }
        "tasks/cancel" => {
            let params: TaskIdParams = parse_params(request)?;
            let task = state.engine.cancel_task(&params.id).await?;
            Ok(RpcReply::Value(serde_json::to_value(task)?))
        }
        "tasks/resubscribe" => {
            require_streaming(state)?;
            let params: TaskIdParams = parse_params(request)?;
            let stream = state.engine.resubscribe(&params.id).await?;
            Ok(RpcReply::Stream(stream))
        }
        "tasks/pushNotificationConfig/set" => {
            require_push(state)?;
            let params: TaskPushConfigParams = parse_params(request)?;
            let config = params.config.ok_or_else(|| {
                RuntimeError::Protocol(ProtocolError::new(
                    ErrorCode::InvalidParams,
                    "missing push notification config",
                ))
            })?;
            let config = state.engine.set_push_config(&params.id, config).await?;
            Ok(RpcReply::Value(serde_json::to_value(TaskPushConfigParams {
                id: params.id,
                config: Some(config),
            })?))
        }
        "tasks/pushNotificationConfig/get" => {
            require_push(state)?;
            let params: TaskIdParams = parse_params(request)?;
            let config = state.engine.get_push_config(&params.id).await?;
            Ok(RpcReply::Value(serde_json::to_value(TaskPushConfigParams {
                id: params.id,
                config,
            })?))
        }
        _ => Err(RuntimeError::Protocol(ErrorCode::MethodNotFound.into())),
    }
}

fn parse_params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, RuntimeError> {
    let params = request.params.clone().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(params).map_err(|err| {
        RuntimeError::Protocol(ProtocolError::new(ErrorCode::InvalidParams, err.to_string()))
    })
}

fn require_streaming(state: &AppState) -> Result<(), RuntimeError> {
    if state.card.capabilities.streaming {
        Ok(())
    } else {
        Err(RuntimeError::Unsupported(
            "streaming is not supported by this agent".into(),
        ))
    }
}

fn require_push(state: &AppState) -> Result<(), RuntimeError> {
    if state.card.capabilities.push_notifications {
        Ok(())
    } else {
        Err(RuntimeError::PushNotSupported)
    }
}

/// `message/send` may carry a webhook registration inline; it is subject to
/// the same capability gate as the dedicated config methods.
fn gate_push_config(state: &AppState, params: &MessageSendParams) -> Result<(), RuntimeError> {
    let has_push = params
        .configuration
        .as_ref()
        .and_then(|c| c.push_notification_config.as_ref())
        .is_some();
    if has_push && !state.card.capabilities.push_notifications {
        return Err(RuntimeError::PushNotSupported);
    }
    Ok(())
}
