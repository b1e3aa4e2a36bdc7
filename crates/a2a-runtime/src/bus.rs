use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use a2a_core::ExecutionEvent;
use futures_core::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::RuntimeError;

/// Type alias for a stream of execution events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ExecutionEvent, RuntimeError>> + Send>>;

const DEFAULT_BROADCAST_CAPACITY: usize = 32;
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Producer handle given to an agent execution. Events flow through a bounded
/// channel into the lifecycle engine, which persists them before any
/// subscriber sees them. Publishing after the turn has ended is a silent
/// no-op.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<ExecutionEvent>,
}

impl EventPublisher {
    pub async fn publish(&self, event: ExecutionEvent) -> Result<(), RuntimeError> {
        let _ = self.tx.send(event).await;
        Ok(())
    }
}

pub(crate) fn event_channel(capacity: usize) -> (EventPublisher, mpsc::Receiver<ExecutionEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventPublisher { tx }, rx)
}

/// Per-task fan-out of already-persisted events, backed by
/// `tokio::sync::broadcast`.
///
/// The broadcast sender is wrapped in a `RwLock<Option<...>>` so that
/// `close()` can drop the sender, causing all subscriber streams to end.
pub struct ExecutionBus {
    sender: RwLock<Option<broadcast::Sender<ExecutionEvent>>>,
}

impl ExecutionBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Deliver an event to all current subscribers. Silently dropped if the
    /// bus is closed or nobody is listening.
    pub fn publish(&self, event: ExecutionEvent) {
        let sender = self.sender.read().expect("RwLock poisoned");
        if let Some(ref sender) = *sender {
            let _ = sender.send(event);
        }
    }

    /// Drop the sender; all subscriber streams end after draining buffered
    /// events. Idempotent.
    pub fn close(&self) {
        let mut sender = self.sender.write().expect("RwLock poisoned");
        *sender = None;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().expect("RwLock poisoned").is_none()
    }

    pub fn subscribe(&self) -> EventStream {
        let sender = self.sender.read().expect("RwLock poisoned");
        match sender.as_ref() {
            Some(sender) => {
                let rx = sender.subscribe();
                let stream = BroadcastStream::new(rx).filter_map(|result| match result {
                    Ok(event) => Some(Ok(event)),
                    Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => {
                        None
                    }
                });
                Box::pin(stream)
            }
            None => Box::pin(tokio_stream::empty()),
        }
    }
}

impl Default for ExecutionBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Live buses keyed by task id. A bus exists only while a turn is running;
/// the engine removes it once the turn ends.
pub struct BusRegistry {
    buses: RwLock<HashMap<String, Arc<ExecutionBus>>>,
}

impl BusRegistry {
    pub fn new() -> Self {
        Self {
            buses: RwLock::new(HashMap::new()),
        }
    }

    /// Register a fresh bus for the id, displacing any stale entry left from
    /// an earlier turn.
    pub fn replace(&self, task_id: &str) -> Arc<ExecutionBus> {
        let bus = Arc::new(ExecutionBus::new());
        let mut buses = self.buses.write().expect("RwLock poisoned");
        buses.insert(task_id.to_string(), bus.clone());
        bus
    }

    pub fn get(&self, task_id: &str) -> Option<Arc<ExecutionBus>> {
        let buses = self.buses.read().expect("RwLock poisoned");
        buses.get(task_id).cloned()
    }

    /// Remove the entry only if it still holds `bus`. A pump cleaning up
    /// after its turn must not unregister a successor turn's bus.
    pub fn remove_if(&self, task_id: &str, bus: &Arc<ExecutionBus>) {
        let mut buses = self.buses.write().expect("RwLock poisoned");
        if buses.get(task_id).is_some_and(|current| Arc::ptr_eq(current, bus)) {
            buses.remove(task_id);
        }
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
