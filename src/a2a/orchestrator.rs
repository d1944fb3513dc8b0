//! Orchestrator delegation: discover a peer by skill, forward the request.
//!
//! Picking the skill id is left to an external reasoning step, which can use
//! [`Orchestrator::registry_context`] as its view of what is registered.
//! The first discovered agent is always used; there is no ranking and no
//! fallback to a second candidate.

use crate::a2a::agent_card::AgentCard;
use crate::a2a::client::{A2aClient, ClientError};
use crate::a2a::types::{Part, TaskState};

#[derive(Debug, thiserror::Error)]
pub enum DelegationError {
    #[error("user request cannot be empty")]
    EmptyRequest,

    #[error("discovery for skill ID \"{skill_id}\" failed: {source}")]
    Discovery {
        skill_id: String,
        #[source]
        source: ClientError,
    },

    #[error("Discovery failed for skill ID \"{skill_id}\": no registered agent offers it")]
    NoAgentForSkill { skill_id: String },

    #[error("call to agent at {url} failed: {source}")]
    Call {
        url: String,
        #[source]
        source: ClientError,
    },
}

/// What the selected agent did with the request.
#[derive(Debug, Clone, PartialEq)]
pub enum DelegationOutcome {
    Completed { artifacts: Vec<Part> },
    Failed { state: TaskState, message: String },
}

#[derive(Debug, Clone)]
pub struct Delegation {
    pub agent: AgentCard,
    pub task_id: String,
    pub outcome: DelegationOutcome,
}

impl Delegation {
    /// Text artifacts joined by newlines, or the failure message verbatim.
    pub fn render(&self) -> String {
        match &self.outcome {
            DelegationOutcome::Completed { artifacts } => artifacts
                .iter()
                .map(|part| match part {
                    Part::Text { text } => text.clone(),
                    Part::Data { data } => data.to_string(),
                    Part::Other(_) => String::new(),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            DelegationOutcome::Failed { message, .. } => message.clone(),
        }
    }
}

pub struct Orchestrator {
    client: A2aClient,
    registry_url: String,
}

impl Orchestrator {
    pub fn new(client: A2aClient, registry_url: impl Into<String>) -> Self {
        Self {
            client,
            registry_url: registry_url.into(),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Find an agent for `skill_id` and forward `request` to it as text.
    pub async fn delegate(&self, skill_id: &str, request: &str) -> Result<Delegation, DelegationError> {
        if request.trim().is_empty() {
            return Err(DelegationError::EmptyRequest);
        }

        let candidates = self
            .client
            .discover(&self.registry_url, skill_id)
            .await
            .map_err(|source| DelegationError::Discovery {
                skill_id: skill_id.to_string(),
                source,
            })?;

        let Some(agent) = candidates.into_iter().next() else {
            tracing::warn!("Orchestrator: no agent found for skill '{}'", skill_id);
            return Err(DelegationError::NoAgentForSkill {
                skill_id: skill_id.to_string(),
            });
        };

        tracing::info!(
            "Orchestrator: delegating '{}' to {} at {}",
            skill_id,
            agent.name,
            agent.url
        );

        let task = self
            .client
            .call(&agent.url, vec![Part::text(request)], None)
            .await
            .map_err(|source| DelegationError::Call {
                url: agent.url.clone(),
                source,
            })?;

        let outcome = if task.is_completed() {
            DelegationOutcome::Completed {
                artifacts: task.artifacts.clone(),
            }
        } else {
            DelegationOutcome::Failed {
                state: task.status.state,
                message: task
                    .status_text()
                    .unwrap_or("Agent task did not complete successfully.")
                    .to_string(),
            }
        };

        Ok(Delegation {
            agent,
            task_id: task.id,
            outcome,
        })
    }

    /// Human-readable snapshot of the registry. Errors are rendered inline.
    pub async fn registry_context(&self) -> String {
        let mut context = String::from("== Current Registered Agents ==\n");

        match self.client.list_agents(&self.registry_url).await {
            Ok(agents) if agents.is_empty() => context.push_str("  (none)\n"),
            Ok(agents) => {
                let mut agents: Vec<_> = agents.into_iter().collect();
                agents.sort_by(|a, b| a.0.cmp(&b.0));
                for (url, card) in agents {
                    let skills = card.skill_ids().join(", ");
                    context.push_str(&format!(
                        "  - Name: {}, URL: {}, Skill IDs: {}\n",
                        card.name,
                        url,
                        if skills.is_empty() { "None" } else { &skills }
                    ));
                }
            }
            Err(e) => {
                tracing::warn!("Orchestrator: failed to fetch registry context: {}", e);
                context.push_str(&format!("  - Error fetching registry: {}\n", e));
            }
        }

        context.push_str("== End of Context ==\n");
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn orchestrator(registry_url: &str) -> Orchestrator {
        Orchestrator::new(
            A2aClient::new(Duration::from_secs(5)).expect("client"),
            registry_url,
        )
    }

    fn discovery_body(cards: serde_json::Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "result": {
                "id": "t-d",
                "status": {"state": "completed", "timestamp": "2025-01-01T00:00:00+00:00"},
                "artifacts": cards, "history": [], "metadata": {}
            },
            "id": "r-d"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected_without_network() {
        let err = orchestrator("http://127.0.0.1:1")
            .delegate("web_search", "   ")
            .await
            .expect_err("empty");
        assert!(matches!(err, DelegationError::EmptyRequest));
    }

    #[tokio::test]
    async fn test_no_candidates_names_the_skill() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/a2a")
            .with_status(200)
            .with_body(discovery_body(json!([])))
            .create_async()
            .await;

        let err = orchestrator(&server.url())
            .delegate("translate", "bonjour")
            .await
            .expect_err("no agents");
        assert!(matches!(err, DelegationError::NoAgentForSkill { ref skill_id } if skill_id == "translate"));
        assert!(err.to_string().contains("\"translate\""));
    }

    #[tokio::test]
    async fn test_unreachable_first_candidate_is_a_call_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/a2a")
            .with_status(200)
            .with_body(discovery_body(json!([
                {"type": "data", "data": {"name": "Gone", "url": "http://127.0.0.1:1/a2a", "skills": [{"id": "web_search"}]}}
            ])))
            .create_async()
            .await;

        let err = orchestrator(&server.url())
            .delegate("web_search", "rust news")
            .await
            .expect_err("unreachable worker");
        match err {
            DelegationError::Call { url, source } => {
                assert_eq!(url, "http://127.0.0.1:1/a2a");
                assert!(matches!(source, ClientError::Connection { .. }));
            }
            other => unreachable!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_registry_context_renders_error_inline() {
        let context = orchestrator("http://127.0.0.1:1").registry_context().await;
        assert!(context.contains("Error fetching registry"));
        assert!(context.ends_with("== End of Context ==\n"));
    }

    #[test]
    fn test_render_failed_outcome_verbatim() {
        let delegation = Delegation {
            agent: serde_json::from_value(json!({"name": "W", "url": "http://w/a2a"})).expect("card"),
            task_id: "t".to_string(),
            outcome: DelegationOutcome::Failed {
                state: TaskState::Failed,
                message: "Agent execution error: quota exceeded".to_string(),
            },
        };
        assert_eq!(delegation.render(), "Agent execution error: quota exceeded");
    }
}
