use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::message::Message;
use crate::push::PushNotificationConfig;

/// JSON-RPC 2.0 request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params: Some(params),
            id,
        }
    }
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
    pub id: RequestId,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: RequestId, error: ProtocolError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// --- Method parameter types ---

/// Params for `message/send` and `message/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    /// History trim applied to the returned task snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,
    /// Deadline for the blocking `message/send` collapse, milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Webhook registered atomically with the send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notification_config: Option<PushNotificationConfig>,
}

/// Params for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,
}

/// Params for `tasks/cancel` and `tasks/resubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    pub id: String,
}

/// Params for `tasks/pushNotificationConfig/set` and `/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushConfigParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PushNotificationConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::message::Role;

    #[test]
    fn test_request_id_variants() {
        let num: RequestId = serde_json::from_str("42").unwrap();
        assert!(matches!(num, RequestId::Number(42)));

        let string: RequestId = serde_json::from_str("\"req-1\"").unwrap();
        assert!(matches!(string, RequestId::String(s) if s == "req-1"));

        let null: RequestId = serde_json::from_str("null").unwrap();
        assert!(matches!(null, RequestId::Null));
    }

    #[test]
    fn test_request_roundtrip() {
        let req = JsonRpcRequest::new(
            RequestId::Number(1),
            "message/send",
            serde_json::json!({"message": {"messageId": "m-1", "role": "user", "parts": []}}),
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));

        let back: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, "message/send");
    }

    #[test]
    fn test_success_response_omits_error() {
        let resp = JsonRpcResponse::success(RequestId::Number(7), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_error_response_omits_result() {
        let resp = JsonRpcResponse::error(
            RequestId::String("req-9".into()),
            ErrorCode::TaskNotFound.into(),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("-32001"));
        assert!(!json.contains("\"result\""));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["id"], "req-9");
    }

    #[test]
    fn test_send_params_with_configuration() {
        let params = MessageSendParams {
            message: Message::text("m-1", Role::User, "hello"),
            configuration: Some(MessageSendConfiguration {
                history_length: Some(5),
                timeout_ms: Some(30_000),
                push_notification_config: None,
            }),
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"historyLength\":5"));
        assert!(json.contains("\"timeoutMs\":30000"));

        let back: MessageSendParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.configuration.unwrap().history_length, Some(5));
    }

    #[test]
    fn test_task_query_params_minimal() {
        let params: TaskQueryParams = serde_json::from_str(r#"{"id": "t-1"}"#).unwrap();
        assert_eq!(params.id, "t-1");
        assert!(params.history_length.is_none());
    }

    #[test]
    fn test_push_config_params() {
        let json = r#"{"id": "t-1", "config": {"url": "https://example.com/hook"}}"#;
        let params: TaskPushConfigParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.config.unwrap().url, "https://example.com/hook");
    }
}
