use serde::{Deserialize, Serialize};

/// Capability flags the transport consults before honoring streaming or
/// push-notification calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

/// Out-of-band capability/metadata document, served at
/// `/.well-known/agent-card.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<AgentSkill>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_input_modes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_output_modes: Option<Vec<String>>,
}

impl AgentCard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: None,
            capabilities: AgentCapabilities::default(),
            skills: None,
            default_input_modes: None,
            default_output_modes: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_roundtrip() {
        let card = AgentCard::new("Echo Agent").with_capabilities(AgentCapabilities {
            streaming: true,
            push_notifications: false,
        });

        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"pushNotifications\":false"));

        let back: AgentCard = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Echo Agent");
        assert!(back.capabilities.streaming);
        assert!(!back.capabilities.push_notifications);
    }

    #[test]
    fn test_capabilities_default_false() {
        let json = r#"{"name": "Minimal"}"#;
        let card: AgentCard = serde_json::from_str(json).unwrap();
        assert!(!card.capabilities.streaming);
        assert!(!card.capabilities.push_notifications);
    }

    #[test]
    fn test_skills_serde() {
        let json = r#"{
            "name": "Skilled",
            "capabilities": {"streaming": true},
            "skills": [{"id": "echo", "name": "Echo", "tags": ["demo"]}]
        }"#;
        let card: AgentCard = serde_json::from_str(json).unwrap();
        let skills = card.skills.unwrap();
        assert_eq!(skills[0].id, "echo");
        assert_eq!(skills[0].tags.as_ref().unwrap()[0], "demo");
    }
}
