//! Task lifecycle runtime for A2A agents: an in-process engine that drives
//! tasks through their state machine, fans out execution events, and exposes
//! the protocol over JSON-RPC with SSE streaming and webhook push delivery.

pub mod bus;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod push;
pub mod rpc;
pub mod router;
pub mod sse;
pub mod store;

// Convenience re-exports
pub use bus::{BusRegistry, EventPublisher, EventStream, ExecutionBus};
pub use engine::{LifecycleEngine, SendOutcome};
pub use error::RuntimeError;
pub use executor::{AgentExecutor, RequestContext};
pub use hooks::{LoggingHook, RequestHook};
pub use push::{InMemoryPushConfigStore, PushConfigStore, PushDispatcher};
pub use router::{create_router, serve, AppState};
pub use store::{InMemoryTaskStore, TaskStore};
