//! Agent Card model for `.well-known/agent.json` and registry entries.
//!
//! A card advertises one addressable agent: its endpoint URL (the registry
//! key), metadata, and the skills other agents discover it by.

use crate::config::AgentServerConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptor of one addressable agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical A2A endpoint; the registry's identity key.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<AgentCapabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AgentAuthentication>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output_modes: Option<Vec<String>>,
}

/// Informational capability flags; not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
}

/// Declared authentication schemes; not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAuthentication {
    #[serde(default)]
    pub schemes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Discovery key. Unique per card, not globally.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,
}

impl AgentSkill {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            description: None,
            tags: Vec::new(),
            input_modes: None,
            output_modes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_modes(mut self, input: &[&str], output: &[&str]) -> Self {
        self.input_modes = Some(input.iter().map(|m| m.to_string()).collect());
        self.output_modes = Some(output.iter().map(|m| m.to_string()).collect());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("{0}")]
    Malformed(#[from] serde_json::Error),

    #[error("'name' must be a non-empty string")]
    EmptyName,

    #[error("'url' must be a non-empty string")]
    EmptyUrl,

    #[error("skill at index {index} has an empty 'id'")]
    EmptySkillId { index: usize },

    #[error("at least one skill is required")]
    NoSkills,
}

impl AgentCard {
    /// Decode a card from an arbitrary JSON value and validate it.
    pub fn from_value(value: Value) -> Result<Self, DescriptorError> {
        let card: Self = serde_json::from_value(value)?;
        card.validate()?;
        Ok(card)
    }

    /// Registry-level validation. An empty skill list is accepted here.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        if self.url.trim().is_empty() {
            return Err(DescriptorError::EmptyUrl);
        }
        if let Some(index) = self.skills.iter().position(|s| s.id.trim().is_empty()) {
            return Err(DescriptorError::EmptySkillId { index });
        }
        Ok(())
    }

    /// Validation for a card that is about to be advertised: it must carry
    /// at least one skill to be discoverable.
    pub fn validate_for_registration(&self) -> Result<(), DescriptorError> {
        if self.url.trim().is_empty() {
            return Err(DescriptorError::EmptyUrl);
        }
        if self.skills.is_empty() {
            return Err(DescriptorError::NoSkills);
        }
        self.validate()
    }

    pub fn has_skill(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|s| s.id == skill_id)
    }

    pub fn skill_ids(&self) -> Vec<&str> {
        self.skills.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Build the Agent Card for a serving agent.
///
/// Default modes follow the first configured skill.
pub fn build_agent_card(config: &AgentServerConfig) -> AgentCard {
    let first = config.skills.first();

    AgentCard {
        name: config.name.clone(),
        description: Some(config.description.clone()),
        url: config.agent_url(),
        version: Some(config.version.clone()),
        capabilities: Some(AgentCapabilities::default()),
        authentication: Some(AgentAuthentication::default()),
        skills: config.skills.clone(),
        default_input_modes: first
            .and_then(|s| s.input_modes.clone())
            .or_else(|| Some(vec!["text".to_string()])),
        default_output_modes: first
            .and_then(|s| s.output_modes.clone())
            .or_else(|| Some(vec!["text".to_string()])),
    }
}

/// The registry's own card, served at its `.well-known/agent.json`.
pub fn registry_agent_card(registry_url: &str) -> AgentCard {
    AgentCard {
        name: "AgentDiscoveryRegistry".to_string(),
        description: Some(
            "A central registry for discovering A2A-compliant agents. \
             Supports registration and discovery by skill ID."
                .to_string(),
        ),
        url: format!("{}/a2a", registry_url.trim_end_matches('/')),
        version: Some("1.0.0".to_string()),
        capabilities: Some(AgentCapabilities::default()),
        authentication: Some(AgentAuthentication::default()),
        skills: vec![
            AgentSkill::new("register_agent", "Register Agent")
                .with_description("Registers an agent by accepting its Agent Card in a DataPart.")
                .with_modes(&["application/json"], &["text"]),
            AgentSkill::new("discover_agents", "Discover Agents")
                .with_description(
                    "Discovers agents based on skill ID provided in a DataPart {'skill_id': '...'}.",
                )
                .with_modes(&["application/json"], &["application/json"]),
        ],
        default_input_modes: None,
        default_output_modes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_agent_card() {
        let mut config = AgentServerConfig::new(
            "WebSearchWorkerAgent",
            "Searches the web",
            vec![
                AgentSkill::new("web_search", "Web Search").with_modes(&["text"], &["text"]),
            ],
        );
        config.port = 8001;
        config.host = "127.0.0.1".to_string();

        let card = build_agent_card(&config);
        assert_eq!(card.url, "http://127.0.0.1:8001/a2a");
        assert_eq!(card.skill_ids(), vec!["web_search"]);
        assert_eq!(card.default_input_modes, Some(vec!["text".to_string()]));
        assert!(card.validate_for_registration().is_ok());
    }

    #[test]
    fn test_registry_card() {
        let card = registry_agent_card("http://localhost:8000/");
        assert_eq!(card.url, "http://localhost:8000/a2a");
        assert!(card.has_skill("register_agent"));
        assert!(card.has_skill("discover_agents"));
    }

    #[test]
    fn test_from_value_minimal_card() {
        let card = AgentCard::from_value(json!({
            "name": "W",
            "url": "http://w/a2a",
            "skills": [{"id": "web_search"}],
            "someExtension": true
        }))
        .expect("valid card");

        assert_eq!(card.name, "W");
        assert!(card.has_skill("web_search"));
        // optional fields are omitted on encode
        assert_eq!(
            serde_json::to_value(&card).expect("encode"),
            json!({"name": "W", "url": "http://w/a2a", "skills": [{"id": "web_search"}]})
        );
    }

    #[test]
    fn test_from_value_rejects_bad_cards() {
        let missing_name = AgentCard::from_value(json!({"url": "http://w", "skills": []}));
        assert!(matches!(missing_name, Err(DescriptorError::Malformed(_))));

        let blank_url = AgentCard::from_value(json!({"name": "W", "url": " ", "skills": []}));
        assert!(matches!(blank_url, Err(DescriptorError::EmptyUrl)));

        let blank_skill =
            AgentCard::from_value(json!({"name": "W", "url": "http://w", "skills": [{"id": ""}]}));
        assert!(matches!(
            blank_skill,
            Err(DescriptorError::EmptySkillId { index: 0 })
        ));

        let skills_not_a_list =
            AgentCard::from_value(json!({"name": "W", "url": "http://w", "skills": "web"}));
        assert!(matches!(skills_not_a_list, Err(DescriptorError::Malformed(_))));
    }

    #[test]
    fn test_registration_requires_skills() {
        let card = AgentCard::from_value(json!({"name": "W", "url": "http://w", "skills": []}))
            .expect("registry accepts empty skills");
        assert!(matches!(
            card.validate_for_registration(),
            Err(DescriptorError::NoSkills)
        ));
    }
}
