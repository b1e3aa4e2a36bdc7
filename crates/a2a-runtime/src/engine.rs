use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use a2a_core::{
    ExecutionEvent, Message, MessageSendParams, PushNotificationConfig, Task, TaskState,
    TaskStatus, TaskStatusUpdateEvent,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::bus::{event_channel, BusRegistry, EventStream, ExecutionBus, EVENT_CHANNEL_CAPACITY};
use crate::error::RuntimeError;
use crate::executor::{AgentExecutor, RequestContext};
use crate::push::{InMemoryPushConfigStore, PushConfigStore, PushDispatcher};
use crate::store::{InMemoryTaskStore, TaskStore};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of a blocking `message/send`: either the task snapshot after the
/// turn ended, or a direct agent message for executions that never created
/// task state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SendOutcome {
    Task(Task),
    Message(Message),
}

enum TurnPlan {
    /// Fresh turn: invoke the executor on a newly registered bus.
    Invoke {
        task: Task,
        message: Message,
        bus: Arc<ExecutionBus>,
    },
    /// The task's turn is already in flight; attach to its live bus without
    /// invoking the executor again.
    Attach { task: Task, bus: Arc<ExecutionBus> },
}

impl TurnPlan {
    fn task(&self) -> &Task {
        match self {
            TurnPlan::Invoke { task, .. } => task,
            TurnPlan::Attach { task, .. } => task,
        }
    }
}

/// Drives tasks through their state machine.
///
/// All writes to a task funnel through a per-task-id async mutex, so
/// concurrent sends and concurrently published events apply one at a time.
/// Events published by the executor are persisted before any subscriber
/// sees them; events arriving after the task reached a terminal state are
/// discarded.
pub struct LifecycleEngine {
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn AgentExecutor>,
    buses: BusRegistry,
    push_configs: Arc<dyn PushConfigStore>,
    dispatcher: Option<Arc<PushDispatcher>>,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    // Cancel tokens keyed by task id, tagged with the turn that registered
    // them so a finished turn's cleanup cannot evict its successor's token.
    cancels: StdMutex<HashMap<String, (u64, CancellationToken)>>,
    turn_seq: AtomicU64,
    default_timeout: Duration,
}

impl LifecycleEngine {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            store: Arc::new(InMemoryTaskStore::new()),
            executor,
            buses: BusRegistry::new(),
            push_configs: Arc::new(InMemoryPushConfigStore::new()),
            dispatcher: None,
            locks: StdMutex::new(HashMap::new()),
            cancels: StdMutex::new(HashMap::new()),
            turn_seq: AtomicU64::new(0),
            default_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_push_config_store(mut self, store: Arc<dyn PushConfigStore>) -> Self {
        self.push_configs = store;
        self
    }

    /// Enable webhook delivery of task status changes.
    pub fn with_push_dispatcher(mut self, dispatcher: PushDispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Deadline applied to blocking sends when the request carries no
    /// `timeoutMs` of its own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Blocking send: start or resume the task's turn, then wait for it to
    /// end. Returns `RuntimeError::Timeout` if the deadline passes first;
    /// the task keeps running in the background.
    pub async fn send_message(
        self: &Arc<Self>,
        params: MessageSendParams,
    ) -> Result<SendOutcome, RuntimeError> {
        let config = params.configuration.unwrap_or_default();
        let timeout_ms = config
            .timeout_ms
            .unwrap_or(self.default_timeout.as_millis() as u64);

        let (task, mut stream) = self
            .start_turn(params.message, config.push_notification_config)
            .await?;
        let task_id = task.id.clone();

        let wait_for_turn_end = async {
            let mut reply: Option<Message> = None;
            while let Some(item) = stream.next().await {
                if let Ok(event) = item {
                    if let ExecutionEvent::Message(m) = &event {
                        if m.task_id.is_none() {
                            reply = Some(m.clone());
                        }
                    }
                    if event.is_turn_end() {
                        break;
                    }
                }
            }
            reply
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), wait_for_turn_end).await {
            Ok(Some(reply)) => Ok(SendOutcome::Message(reply)),
            Ok(None) => {
                let task = self
                    .store
                    .get(&task_id)
                    .await?
                    .ok_or_else(|| RuntimeError::TaskNotFound(task_id.clone()))?;
                Ok(SendOutcome::Task(
                    task.with_history_trimmed(config.history_length),
                ))
            }
            Err(_) => Err(RuntimeError::Timeout(timeout_ms)),
        }
    }

    /// Streaming send: start or resume the task's turn and return its event
    /// stream. The first item is the task snapshot; the stream ends when the
    /// turn does.
    pub async fn stream_message(
        self: &Arc<Self>,
        params: MessageSendParams,
    ) -> Result<EventStream, RuntimeError> {
        let config = params.configuration.unwrap_or_default();
        let (task, stream) = self
            .start_turn(params.message, config.push_notification_config)
            .await?;

        let snapshot = ExecutionEvent::Task(task.with_history_trimmed(config.history_length));
        Ok(Box::pin(
            tokio_stream::once(Ok(snapshot)).chain(stream),
        ))
    }

    pub async fn get_task(
        &self,
        task_id: &str,
        history_length: Option<i32>,
    ) -> Result<Task, RuntimeError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;
        Ok(task.with_history_trimmed(history_length))
    }

    /// Cancel a non-terminal task: fire its cancellation token, run the
    /// executor's cleanup hook, then record the canceled status. Terminal
    /// tasks are not cancelable.
    pub async fn cancel_task(&self, task_id: &str) -> Result<Task, RuntimeError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;
        if task.status.state.is_terminal() {
            return Err(RuntimeError::TaskNotCancelable(task_id.to_string()));
        }

        let token = {
            let cancels = self.cancels.lock().expect("lock poisoned");
            cancels.get(task_id).map(|(_, token)| token.clone())
        };
        if let Some(token) = token {
            token.cancel();
        }
        self.executor.cancel(task_id).await?;

        let event = ExecutionEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: task_id.to_string(),
            context_id: task.context_id.clone(),
            status: TaskStatus::new(TaskState::Canceled),
            is_final: true,
            metadata: None,
        });
        let applied = {
            let lock = self.lock_for(task_id);
            let _guard = lock.lock().await;
            let applied = self.apply_event_locked(task_id, event).await?;
            if let Some(event) = applied.as_ref() {
                if let Some(bus) = self.buses.get(task_id) {
                    bus.publish(event.clone());
                    bus.close();
                    self.buses.remove_if(task_id, &bus);
                }
            }
            applied
        };
        match applied {
            Some(_) => self.dispatch_push(task_id).await,
            // The executor won the race and already ended the task.
            None => return Err(RuntimeError::TaskNotCancelable(task_id.to_string())),
        }

        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))
    }

    /// Re-attach to a task's event stream. The first item is the current
    /// snapshot; if the task is still running, live events follow. For a
    /// terminal or idle task the stream ends after the snapshot.
    pub async fn resubscribe(&self, task_id: &str) -> Result<EventStream, RuntimeError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;

        let running = !task.status.state.is_terminal();
        let snapshot = tokio_stream::once(Ok(ExecutionEvent::Task(task)));
        match self.buses.get(task_id) {
            Some(bus) if running => Ok(Box::pin(snapshot.chain(bus.subscribe()))),
            _ => Ok(Box::pin(snapshot)),
        }
    }

    pub async fn set_push_config(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<PushNotificationConfig, RuntimeError> {
        if self.store.get(task_id).await?.is_none() {
            return Err(RuntimeError::TaskNotFound(task_id.to_string()));
        }
        self.push_configs.set(task_id, config.clone()).await?;
        Ok(config)
    }

    pub async fn get_push_config(
        &self,
        task_id: &str,
    ) -> Result<Option<PushNotificationConfig>, RuntimeError> {
        if self.store.get(task_id).await?.is_none() {
            return Err(RuntimeError::TaskNotFound(task_id.to_string()));
        }
        self.push_configs.get(task_id).await
    }

    // --- turn plumbing ---

    /// Resolve the inbound message against stored task state, subscribe to
    /// the task's bus, and kick off the executor when a fresh turn is
    /// needed. The subscription is taken before the executor starts so no
    /// event can be missed.
    async fn start_turn(
        self: &Arc<Self>,
        message: Message,
        push: Option<PushNotificationConfig>,
    ) -> Result<(Task, EventStream), RuntimeError> {
        let plan = self.prepare_turn(message).await?;
        if let Some(config) = push {
            self.push_configs.set(&plan.task().id, config).await?;
        }

        match plan {
            TurnPlan::Attach { task, bus } => {
                let stream = bus.subscribe();
                Ok((task, stream))
            }
            TurnPlan::Invoke { task, message, bus } => {
                let stream = bus.subscribe();
                self.spawn_execution(task.clone(), message, bus);
                Ok((task, stream))
            }
        }
    }

    /// Decide what the inbound message means for task state, under the
    /// task's lock:
    /// - no task id, or an id the store has never seen: create a new task
    ///   with the message as history (ids may be client- or server-assigned)
    /// - terminal task: mint a follow-up task in the same context
    /// - interrupted task: append the message and re-invoke the executor
    /// - running task: append the message and attach to the live bus
    ///
    /// The bus for the turn is registered inside the critical section, so
    /// the invoke-vs-attach decision is atomic: of N concurrent sends for
    /// one id, exactly one invokes the executor and the rest attach.
    async fn prepare_turn(&self, mut message: Message) -> Result<TurnPlan, RuntimeError> {
        let Some(task_id) = message.task_id.clone() else {
            // A freshly minted uuid has no concurrent senders to race with.
            let task_id = uuid::Uuid::new_v4().to_string();
            message.task_id = Some(task_id.clone());
            let task = self.create_task(&task_id, &mut message).await?;
            let bus = self.buses.replace(&task_id);
            return Ok(TurnPlan::Invoke { task, message, bus });
        };

        let lock = self.lock_for(&task_id);
        let _guard = lock.lock().await;

        let Some(mut task) = self.store.get(&task_id).await? else {
            // First message for a client-assigned id creates the task.
            let task = self.create_task(&task_id, &mut message).await?;
            let bus = self.buses.replace(&task_id);
            return Ok(TurnPlan::Invoke { task, message, bus });
        };

        if task.status.state.is_terminal() {
            // Terminal tasks never restart; the message opens a follow-up
            // task in the same context.
            let follow_up_id = uuid::Uuid::new_v4().to_string();
            message.task_id = Some(follow_up_id.clone());
            message.context_id = Some(task.context_id.clone());
            let refs = message.reference_task_ids.get_or_insert_with(Vec::new);
            if !refs.contains(&task_id) {
                refs.push(task_id.clone());
            }

            let mut follow_up = Task::new(follow_up_id, task.context_id.clone());
            follow_up.status.timestamp = Some(now_rfc3339());
            follow_up.history = Some(vec![message.clone()]);
            self.store.put(follow_up.clone()).await?;
            tracing::debug!(
                task_id = %follow_up.id,
                prior_task_id = %task_id,
                "created follow-up task"
            );
            let bus = self.buses.replace(&follow_up.id);
            return Ok(TurnPlan::Invoke {
                task: follow_up,
                message,
                bus,
            });
        }

        message.task_id = Some(task_id.clone());
        message.context_id = Some(task.context_id.clone());
        task.history.get_or_insert_with(Vec::new).push(message.clone());
        self.store.append_history(&task_id, message.clone()).await?;

        // A live bus means a turn is in flight (the pump closes the bus under
        // this lock when its turn ends), so interrupted and freshly resumed
        // tasks are told apart without a second racy check.
        match self.buses.get(&task_id) {
            Some(bus) if !bus.is_closed() => Ok(TurnPlan::Attach { task, bus }),
            _ => {
                let bus = self.buses.replace(&task_id);
                Ok(TurnPlan::Invoke { task, message, bus })
            }
        }
    }

    async fn create_task(
        &self,
        task_id: &str,
        message: &mut Message,
    ) -> Result<Task, RuntimeError> {
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        message.context_id = Some(context_id.clone());

        let mut task = Task::new(task_id, context_id);
        task.status.timestamp = Some(now_rfc3339());
        task.history = Some(vec![message.clone()]);
        self.store.put(task.clone()).await?;
        tracing::debug!(task_id = %task.id, "created task");
        Ok(task)
    }

    fn spawn_execution(self: &Arc<Self>, task: Task, message: Message, bus: Arc<ExecutionBus>) {
        let turn = self
            .turn_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let token = CancellationToken::new();
        {
            let mut cancels = self.cancels.lock().expect("lock poisoned");
            cancels.insert(task.id.clone(), (turn, token.clone()));
        }

        let (publisher, rx) = event_channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(Arc::clone(self).pump(task.id.clone(), turn, bus, rx));

        let executor = self.executor.clone();
        let task_id = task.id.clone();
        let context_id = task.context_id.clone();
        let ctx = RequestContext::new(
            task.id.clone(),
            task.context_id.clone(),
            message,
            Some(task),
            token,
        );
        tokio::spawn(async move {
            if let Err(err) = executor.execute(ctx, publisher.clone()).await {
                tracing::error!(task_id = %task_id, error = %err, "agent execution failed");
                // Execution errors surface as a failed status carrying the
                // error text, never as a transport failure.
                let mut status = TaskStatus::new(TaskState::Failed);
                let mut report = Message::text(
                    uuid::Uuid::new_v4().to_string(),
                    a2a_core::Role::Agent,
                    err.to_string(),
                );
                report.task_id = Some(task_id.clone());
                report.context_id = Some(context_id.clone());
                status.message = Some(report);
                let failed = ExecutionEvent::StatusUpdate(TaskStatusUpdateEvent {
                    task_id,
                    context_id,
                    status,
                    is_final: true,
                    metadata: None,
                });
                let _ = publisher.publish(failed).await;
            }
        });
    }

    /// Consume executor events for one turn: persist each event, then
    /// re-deliver it to subscribers. Closes the bus once the turn ends or
    /// the executor drops its publisher. Persisting, publishing, and closing
    /// happen under the task's lock, so `prepare_turn` observing a live bus
    /// is a reliable sign the turn is still in flight.
    async fn pump(
        self: Arc<Self>,
        task_id: String,
        turn: u64,
        bus: Arc<ExecutionBus>,
        mut rx: mpsc::Receiver<ExecutionEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            let lock = self.lock_for(&task_id);
            let guard = lock.lock().await;
            match self.apply_event_locked(&task_id, event).await {
                Ok(Some(event)) => {
                    let turn_end = event.is_turn_end();
                    let status_change = matches!(event, ExecutionEvent::StatusUpdate(_));
                    bus.publish(event);
                    if turn_end {
                        bus.close();
                        self.buses.remove_if(&task_id, &bus);
                    }
                    drop(guard);
                    if status_change {
                        self.dispatch_push(&task_id).await;
                    }
                    if turn_end {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(task_id = %task_id, "discarded event for ended task");
                }
                Err(err) => {
                    tracing::error!(task_id = %task_id, error = %err, "failed to apply event");
                }
            }
        }
        bus.close();
        self.buses.remove_if(&task_id, &bus);
        {
            let mut cancels = self.cancels.lock().expect("lock poisoned");
            if cancels.get(&task_id).is_some_and(|(t, _)| *t == turn) {
                cancels.remove(&task_id);
            }
        }
        // Terminal tasks take no further writes, so their lock entry can go.
        // Interrupted tasks keep theirs; the resumed turn reuses it.
        if let Ok(Some(task)) = self.store.get(&task_id).await {
            if task.status.state.is_terminal() {
                let mut locks = self.locks.lock().expect("lock poisoned");
                locks.remove(&task_id);
            }
        }
    }

    /// Fold one event into stored task state. Callers hold the task's lock.
    /// Returns the event as it should be delivered (status timestamps get
    /// filled in), or `None` if the task already ended and the event must
    /// be discarded.
    async fn apply_event_locked(
        &self,
        task_id: &str,
        mut event: ExecutionEvent,
    ) -> Result<Option<ExecutionEvent>, RuntimeError> {
        let mut task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound(task_id.to_string()))?;
        if task.status.state.is_terminal() {
            return Ok(None);
        }

        match &mut event {
            ExecutionEvent::Task(snapshot) => {
                debug_assert_eq!(snapshot.id, task_id, "snapshot for the wrong task");
                if snapshot.history.is_none() {
                    snapshot.history = task.history.clone();
                }
                if snapshot.status.timestamp.is_none() {
                    snapshot.status.timestamp = Some(now_rfc3339());
                }
                task = snapshot.clone();
            }
            ExecutionEvent::Message(message) => {
                if message.task_id.as_deref() == Some(task_id) {
                    task.history.get_or_insert_with(Vec::new).push(message.clone());
                }
            }
            ExecutionEvent::StatusUpdate(update) => {
                if update.status.timestamp.is_none() {
                    update.status.timestamp = Some(now_rfc3339());
                }
                // Timestamps never go backwards within a task.
                if let (Some(prev), Some(next)) =
                    (&task.status.timestamp, &update.status.timestamp)
                {
                    if next < prev {
                        update.status.timestamp = Some(prev.clone());
                    }
                }
                if let Some(message) = &update.status.message {
                    task.history.get_or_insert_with(Vec::new).push(message.clone());
                }
                task.status = update.status.clone();
            }
            ExecutionEvent::ArtifactUpdate(update) => {
                let artifacts = task.artifacts.get_or_insert_with(Vec::new);
                match artifacts
                    .iter_mut()
                    .find(|a| a.artifact_id == update.artifact.artifact_id)
                {
                    Some(existing) if update.append => {
                        existing.parts.extend(update.artifact.parts.clone());
                    }
                    Some(existing) => *existing = update.artifact.clone(),
                    None => artifacts.push(update.artifact.clone()),
                }
            }
        }

        self.store.put(task).await?;
        Ok(Some(event))
    }

    async fn dispatch_push(&self, task_id: &str) {
        let Some(dispatcher) = self.dispatcher.clone() else {
            return;
        };
        let config = match self.push_configs.get(task_id).await {
            Ok(Some(config)) => config,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "push config lookup failed");
                return;
            }
        };
        match self.store.get(task_id).await {
            Ok(Some(task)) => {
                tokio::spawn(async move {
                    dispatcher.notify(&config, &task).await;
                });
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "push snapshot lookup failed");
            }
        }
    }

    fn lock_for(&self, task_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock poisoned");
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
