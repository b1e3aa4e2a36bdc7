use std::collections::HashMap;
use std::time::Duration;

use a2a_core::{PushNotificationConfig, Task};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RuntimeError;

/// Per-task webhook registrations. A later `set` for the same task replaces
/// the earlier one.
#[async_trait]
pub trait PushConfigStore: Send + Sync + 'static {
    async fn set(&self, task_id: &str, config: PushNotificationConfig)
        -> Result<(), RuntimeError>;
    async fn get(&self, task_id: &str) -> Result<Option<PushNotificationConfig>, RuntimeError>;
    async fn remove(&self, task_id: &str) -> Result<(), RuntimeError>;
}

pub struct InMemoryPushConfigStore {
    configs: RwLock<HashMap<String, PushNotificationConfig>>,
}

impl InMemoryPushConfigStore {
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPushConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushConfigStore for InMemoryPushConfigStore {
    async fn set(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<(), RuntimeError> {
        let mut configs = self.configs.write().await;
        configs.insert(task_id.to_string(), config);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<PushNotificationConfig>, RuntimeError> {
        let configs = self.configs.read().await;
        Ok(configs.get(task_id).cloned())
    }

    async fn remove(&self, task_id: &str) -> Result<(), RuntimeError> {
        let mut configs = self.configs.write().await;
        configs.remove(task_id);
        Ok(())
    }
}

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers task snapshots to registered webhooks. Delivery is best-effort:
/// failures are logged, retried with doubling backoff, and never surface to
/// the task lifecycle.
pub struct PushDispatcher {
    client: reqwest::Client,
}

impl PushDispatcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// POST the task snapshot as JSON to the configured webhook.
    pub async fn notify(&self, config: &PushNotificationConfig, task: &Task) {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.send_once(config, task).await {
                Ok(status) if status.is_success() => {
                    tracing::debug!(task_id = %task.id, url = %config.url, "push notification delivered");
                    return;
                }
                Ok(status) if status.is_client_error() => {
                    // The receiver rejected the payload; retrying won't help.
                    tracing::warn!(
                        task_id = %task.id,
                        url = %config.url,
                        status = %status,
                        "push notification rejected"
                    );
                    return;
                }
                Ok(status) => {
                    tracing::warn!(
                        task_id = %task.id,
                        url = %config.url,
                        status = %status,
                        attempt,
                        "push notification failed"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        task_id = %task.id,
                        url = %config.url,
                        error = %err,
                        attempt,
                        "push notification failed"
                    );
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        tracing::error!(task_id = %task.id, url = %config.url, "push notification gave up");
    }

    async fn send_once(
        &self,
        config: &PushNotificationConfig,
        task: &Task,
    ) -> Result<reqwest::StatusCode, reqwest::Error> {
        let mut request = self.client.post(&config.url).json(task);
        if let Some(token) = &config.token {
            request = request.header("X-A2A-Notification-Token", token);
        }
        if let Some(auth) = &config.authentication {
            let bearer = auth
                .schemes
                .as_ref()
                .map(|s| s.iter().any(|scheme| scheme.eq_ignore_ascii_case("bearer")))
                .unwrap_or(false);
            if bearer {
                if let Some(credentials) = &auth.credentials {
                    request = request.bearer_auth(credentials);
                }
            }
        }
        let response = request.send().await?;
        Ok(response.status())
    }
}

impl Default for PushDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> PushNotificationConfig {
        PushNotificationConfig {
            url: url.into(),
            token: None,
            authentication: None,
        }
    }

    #[tokio::test]
    async fn test_config_store_set_get() {
        let store = InMemoryPushConfigStore::new();
        store.set("t-1", config("https://a.example/hook")).await.unwrap();

        let got = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(got.url, "https://a.example/hook");
        assert!(store.get("t-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_config_store_set_replaces() {
        let store = InMemoryPushConfigStore::new();
        store.set("t-1", config("https://a.example/hook")).await.unwrap();
        store.set("t-1", config("https://b.example/hook")).await.unwrap();

        let got = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(got.url, "https://b.example/hook");
    }

    #[tokio::test]
    async fn test_config_store_remove() {
        let store = InMemoryPushConfigStore::new();
        store.set("t-1", config("https://a.example/hook")).await.unwrap();
        store.remove("t-1").await.unwrap();
        assert!(store.get("t-1").await.unwrap().is_none());

        // Removing a missing entry is a no-op
        store.remove("t-1").await.unwrap();
    }
}
