//! Runtime configuration.
//!
//! Settings are layered with the `config` crate: compiled-in defaults, then
//! an optional TOML file, then `A2A__SECTION__KEY` environment variables.

use crate::a2a::agent_card::AgentSkill;
use crate::a2a::registration::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid agent configuration: {0}")]
    Invalid(String),
}

/// Fully resolved process settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub client: ClientSettings,
    pub registration: RegistrationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL; defaults to `http://host:port`.
    #[serde(default)]
    pub public_url: Option<String>,
    pub agent_ttl_secs: u64,
}

impl RegistrySettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn agent_ttl(&self) -> Duration {
        Duration::from_secs(self.agent_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub timeout_secs: u64,
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationSettings {
    /// Registry base URL. Registration is skipped when unset.
    #[serde(default)]
    pub registry_url: Option<String>,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl RegistrationSettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

impl Settings {
    /// Load settings, optionally layering a TOML file over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder()
            .set_default("registry.host", "0.0.0.0")?
            .set_default("registry.port", 8000_i64)?
            .set_default("registry.agent_ttl_secs", 300_i64)?
            .set_default("client.timeout_secs", 20_i64)?
            .set_default("registration.max_attempts", 3_i64)?
            .set_default("registration.retry_delay_secs", 5_i64)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix("A2A")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        tracing::debug!(
            "Settings loaded: registry={}, ttl={}s",
            settings.registry.bind_addr(),
            settings.registry.agent_ttl_secs
        );
        Ok(settings)
    }
}

/// Configuration for serving one worker agent over A2A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentServerConfig {
    pub name: String,
    pub description: String,
    #[serde(default = "default_agent_host")]
    pub host: String,
    #[serde(default = "default_agent_port")]
    pub port: u16,
    /// Externally reachable base URL; defaults to `http://host:port`.
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default = "default_agent_version")]
    pub version: String,
    pub skills: Vec<AgentSkill>,
}

fn default_agent_host() -> String {
    "0.0.0.0".to_string()
}

fn default_agent_port() -> u16 {
    8001
}

fn default_agent_version() -> String {
    "1.0.0".to_string()
}

impl AgentServerConfig {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        skills: Vec<AgentSkill>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            host: default_agent_host(),
            port: default_agent_port(),
            public_url: None,
            version: default_agent_version(),
            skills,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// The A2A endpoint advertised in the agent's card.
    pub fn agent_url(&self) -> String {
        format!("{}/a2a", self.base_url())
    }

    /// A serving agent needs a name and at least one skill.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.name.trim().is_empty() {
            return Err(SettingsError::Invalid("agent name must not be empty".to_string()));
        }
        if self.skills.is_empty() {
            return Err(SettingsError::Invalid(
                "at least one skill must be defined".to_string(),
            ));
        }
        Ok(())
    }
}
