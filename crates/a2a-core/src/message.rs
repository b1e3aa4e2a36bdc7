use serde::{Deserialize, Serialize};

use crate::part::Part;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One turn of dialogue, from either the client or the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Cross-task citations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_task_ids: Option<Vec<String>>,
}

impl Message {
    /// Convenience constructor for a single-text-part message.
    pub fn text(message_id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            role,
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
            metadata: None,
            reference_task_ids: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartContent;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        let agent: Role = serde_json::from_str("\"agent\"").unwrap();
        assert_eq!(agent, Role::Agent);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = Message::text("msg-1", Role::User, "Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"messageId\""));
        assert!(json.contains("\"user\""));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_id, "msg-1");
        match &back.parts[0].content {
            PartContent::Text { text } => assert_eq!(text, "Hello"),
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_omitted() {
        let msg = Message::text("msg-1", Role::Agent, "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("contextId"));
        assert!(!json.contains("taskId"));
        assert!(!json.contains("referenceTaskIds"));
    }

    #[test]
    fn test_reference_task_ids_roundtrip() {
        let mut msg = Message::text("msg-1", Role::User, "see earlier work");
        msg.reference_task_ids = Some(vec!["t-1".into(), "t-2".into()]);

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"referenceTaskIds\":[\"t-1\",\"t-2\"]"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.reference_task_ids.unwrap().len(), 2);
    }
}
