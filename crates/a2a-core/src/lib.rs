//! A2A protocol data model: tasks, messages, parts, artifacts, execution
//! events, agent cards, and JSON-RPC framing. Pure data, no I/O.

pub mod agent_card;
pub mod artifact;
pub mod error;
pub mod event;
pub mod jsonrpc;
pub mod message;
pub mod part;
pub mod push;
pub mod task;

// Convenience re-exports
pub use agent_card::{AgentCapabilities, AgentCard, AgentSkill};
pub use artifact::Artifact;
pub use error::{ErrorCode, ProtocolError};
pub use event::{ExecutionEvent, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
pub use jsonrpc::{
    JsonRpcRequest, JsonRpcResponse, MessageSendConfiguration, MessageSendParams, RequestId,
    TaskIdParams, TaskPushConfigParams, TaskQueryParams,
};
pub use message::{Message, Role};
pub use part::{FileContent, Part, PartContent};
pub use push::{PushNotificationAuthInfo, PushNotificationConfig};
pub use task::{Task, TaskState, TaskStatus};
