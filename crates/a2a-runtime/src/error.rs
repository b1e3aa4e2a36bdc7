use a2a_core::{ErrorCode, ProtocolError};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task not cancelable: {0}")]
    TaskNotCancelable(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Push notifications not supported")]
    PushNotSupported,

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event bus closed")]
    BusClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtocolError> for RuntimeError {
    fn from(err: ProtocolError) -> Self {
        RuntimeError::Protocol(err)
    }
}

impl From<&RuntimeError> for ProtocolError {
    fn from(err: &RuntimeError) -> Self {
        match err {
            RuntimeError::Protocol(e) => e.clone(),
            RuntimeError::TaskNotFound(id) => {
                ProtocolError::new(ErrorCode::TaskNotFound, format!("Task not found: {id}"))
            }
            RuntimeError::TaskNotCancelable(id) => ProtocolError::new(
                ErrorCode::TaskNotCancelable,
                format!("Task not cancelable: {id}"),
            ),
            RuntimeError::Unsupported(msg) => ProtocolError::new(
                ErrorCode::UnsupportedOperation,
                format!("Unsupported operation: {msg}"),
            ),
            RuntimeError::PushNotSupported => ErrorCode::PushNotSupported.into(),
            RuntimeError::Timeout(ms) => ProtocolError::new(
                ErrorCode::Timeout,
                format!("Request timed out after {ms} ms"),
            ),
            RuntimeError::Internal(msg) => {
                ProtocolError::new(ErrorCode::InternalError, msg.clone())
            }
            RuntimeError::Serialization(e) => {
                ProtocolError::new(ErrorCode::InternalError, e.to_string())
            }
            RuntimeError::BusClosed => {
                ProtocolError::new(ErrorCode::InternalError, "Event bus closed")
            }
            RuntimeError::Io(e) => ProtocolError::new(ErrorCode::InternalError, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_found_maps_to_wire_code() {
        let err = RuntimeError::TaskNotFound("task-123".into());
        let wire: ProtocolError = (&err).into();
        assert_eq!(wire.code, ErrorCode::TaskNotFound.code());
        assert!(wire.message.contains("task-123"));
    }

    #[test]
    fn test_not_cancelable_maps_to_wire_code() {
        let err = RuntimeError::TaskNotCancelable("task-42".into());
        let wire: ProtocolError = (&err).into();
        assert_eq!(wire.code, ErrorCode::TaskNotCancelable.code());
        assert!(wire.message.contains("task-42"));
    }

    #[test]
    fn test_unsupported_operation() {
        let err = RuntimeError::Unsupported("streaming".into());
        let wire: ProtocolError = (&err).into();
        assert_eq!(wire.code, ErrorCode::UnsupportedOperation.code());
        assert!(wire.message.contains("streaming"));
    }

    #[test]
    fn test_push_not_supported() {
        let wire: ProtocolError = (&RuntimeError::PushNotSupported).into();
        assert_eq!(wire.code, ErrorCode::PushNotSupported.code());
    }

    #[test]
    fn test_timeout_carries_deadline() {
        let err = RuntimeError::Timeout(30_000);
        let wire: ProtocolError = (&err).into();
        assert_eq!(wire.code, ErrorCode::Timeout.code());
        assert!(wire.message.contains("30000"));
    }

    #[test]
    fn test_protocol_error_passthrough_preserves_data() {
        let inner = ProtocolError::new(ErrorCode::TaskNotFound, "task missing")
            .with_data(serde_json::json!({"taskId": "t-42"}));
        let err = RuntimeError::Protocol(inner);
        let wire: ProtocolError = (&err).into();
        assert_eq!(wire.code, ErrorCode::TaskNotFound.code());
        assert_eq!(wire.data.unwrap()["taskId"], "t-42");
    }

    #[test]
    fn test_internal_variants_collapse_to_internal_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let errors = [
            RuntimeError::Internal("boom".into()),
            RuntimeError::Serialization(serde_err),
            RuntimeError::BusClosed,
            RuntimeError::Io(io_err),
        ];
        for err in &errors {
            let wire: ProtocolError = err.into();
            assert_eq!(wire.code, ErrorCode::InternalError.code());
            assert!(!wire.message.is_empty());
        }
    }

    #[test]
    fn test_runtime_error_is_std_error() {
        let err = RuntimeError::Internal("test".into());
        let dyn_err: Box<dyn std::error::Error> = Box::new(err);
        assert!(dyn_err.to_string().contains("test"));
    }
}
