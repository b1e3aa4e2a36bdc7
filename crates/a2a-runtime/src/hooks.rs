use a2a_core::ProtocolError;
use async_trait::async_trait;

use crate::error::RuntimeError;

/// Observes JSON-RPC calls around dispatch. `before` runs ahead of method
/// handling and may veto the call by returning an error; `after` observes
/// the outcome.
#[async_trait]
pub trait RequestHook: Send + Sync + 'static {
    async fn before(
        &self,
        method: &str,
        params: Option<&serde_json::Value>,
    ) -> Result<(), RuntimeError> {
        let _ = (method, params);
        Ok(())
    }

    async fn after(&self, method: &str, error: Option<&ProtocolError>) {
        let _ = (method, error);
    }
}

/// Logs every call at debug level, and failures at warn.
pub struct LoggingHook;

#[async_trait]
impl RequestHook for LoggingHook {
    async fn before(
        &self,
        method: &str,
        _params: Option<&serde_json::Value>,
    ) -> Result<(), RuntimeError> {
        tracing::debug!(method, "handling request");
        Ok(())
    }

    async fn after(&self, method: &str, error: Option<&ProtocolError>) {
        match error {
            Some(err) => tracing::warn!(method, code = err.code, error = %err.message, "request failed"),
            None => tracing::debug!(method, "request handled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        before_calls: AtomicUsize,
        after_errors: AtomicUsize,
    }

    #[async_trait]
    impl RequestHook for CountingHook {
        async fn before(
            &self,
            _method: &str,
            _params: Option<&serde_json::Value>,
        ) -> Result<(), RuntimeError> {
            self.before_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn after(&self, _method: &str, error: Option<&ProtocolError>) {
            if error.is_some() {
                self.after_errors.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        struct Bare;
        impl RequestHook for Bare {}

        let hook = Bare;
        hook.before("tasks/get", None).await.unwrap();
        hook.after("tasks/get", None).await;
    }

    #[tokio::test]
    async fn test_counting_hook_observes_calls() {
        let hook = CountingHook {
            before_calls: AtomicUsize::new(0),
            after_errors: AtomicUsize::new(0),
        };
        hook.before("message/send", None).await.unwrap();
        hook.after("message/send", None).await;
        hook.after(
            "message/send",
            Some(&ProtocolError::new(
                a2a_core::ErrorCode::TaskNotFound,
                "missing",
            )),
        )
        .await;

        assert_eq!(hook.before_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hook.after_errors.load(Ordering::SeqCst), 1);
    }
}
