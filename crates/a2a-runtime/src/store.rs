use std::collections::HashMap;

use a2a_core::{Message, Task};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RuntimeError;

/// Durable record of tasks keyed by task id. Implementations must make a
/// completed write visible to every subsequent read, and writes for one id
/// must never be seen partially applied. The engine never deletes tasks;
/// eviction is store policy.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    async fn get(&self, task_id: &str) -> Result<Option<Task>, RuntimeError>;

    /// Full-replace upsert.
    async fn put(&self, task: Task) -> Result<(), RuntimeError>;

    /// Append one message to the task's history. Unknown ids are
    /// `TaskNotFound`, never a generic failure.
    async fn append_history(&self, task_id: &str, message: Message)
        -> Result<(), RuntimeError>;

    /// The most recent `limit` history messages in chronological order.
    /// `None` or a non-positive limit returns the full history.
    async fn list_history(
        &self,
        task_id: &str,
        limit: Option<i32>,
    ) -> Result<Vec<Message>, RuntimeError>;
}

/// In-memory task store backed by a `HashMap`.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> Result<Option<Task>, RuntimeError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn put(&self, task: Task) -> Result<(), RuntimeError> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn append_history(
        &self,
        task_id: &str,
        message: Message,
    ) -> Result<(), RuntimeError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;
        task.history.get_or_insert_with(Vec::new).push(message);
        Ok(())
    }

    async fn list_history(
        &self,
        task_id: &str,
        limit: Option<i32>,
    ) -> Result<Vec<Message>, RuntimeError> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(task_id)
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;
        let history = task.history.as_deref().unwrap_or_default();
        let keep = match limit {
            Some(n) if n > 0 => (n as usize).min(history.len()),
            _ => history.len(),
        };
        Ok(history[history.len() - keep..].to_vec())
    }
}
