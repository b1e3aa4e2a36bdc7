use std::convert::Infallible;

use a2a_core::{ErrorCode, JsonRpcResponse, ProtocolError, RequestId};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::StreamExt;

use crate::bus::EventStream;

/// Wrap an execution event stream as a Server-Sent Events response. Each SSE
/// `data` line carries a full JSON-RPC response envelope sharing the
/// originating request's id; the connection closes when the stream ends.
pub fn sse_response(id: RequestId, stream: EventStream) -> Response {
    let frames = stream.map(move |item| {
        let envelope = match item {
            Ok(event) => match serde_json::to_value(&event) {
                Ok(value) => JsonRpcResponse::success(id.clone(), value),
                Err(err) => JsonRpcResponse::error(
                    id.clone(),
                    ProtocolError::new(ErrorCode::InternalError, err.to_string()),
                ),
            },
            Err(err) => JsonRpcResponse::error(id.clone(), (&err).into()),
        };
        let data = serde_json::to_string(&envelope).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().data(data))
    });

    Sse::new(frames).keep_alive(KeepAlive::default()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_core::{ExecutionEvent, Task};
    use axum::http::header;

    #[tokio::test]
    async fn test_response_has_event_stream_content_type() {
        let stream: EventStream = Box::pin(tokio_stream::once(Ok(ExecutionEvent::Task(
            Task::new("t-1", "ctx-1"),
        ))));
        let response = sse_response(RequestId::Number(1), stream);

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
