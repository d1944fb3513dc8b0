//! Outbound A2A calls: generic `tasks/send`, registration and discovery.
//!
//! Every call is a single blocking round trip with a fixed timeout. Nothing
//! here retries; outcomes are classified into [`ClientError`] and retry
//! policy belongs to the caller.

use crate::a2a::agent_card::{AgentCard, DescriptorError};
use crate::a2a::types::*;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Path suffix of the JSON-RPC endpoint on every agent.
const A2A_PATH: &str = "/a2a";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("target URL cannot be empty")]
    EmptyUrl,

    #[error("required skill ID cannot be empty")]
    EmptySkillId,

    #[error("invalid agent card: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    #[error("timeout connecting to {url}")]
    Timeout { url: String },

    #[error("could not connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("A2A request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} from A2A server: {body}")]
    Http { status: u16, body: String },

    #[error("A2A error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("failed to parse JSON response: {0}")]
    UnparsableBody(String),

    #[error("unexpected response format from A2A server: {0}")]
    MalformedResponse(String),

    #[error("registry task {state}: {message}")]
    TaskNotCompleted { state: TaskState, message: String },

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    /// Timeout, refused connection, non-2xx, or an unreadable body.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::Transport { .. }
                | Self::Http { .. }
                | Self::UnparsableBody(_)
        )
    }
}

#[derive(Debug, Deserialize)]
struct RegisteredAgents {
    #[serde(default)]
    registered_agents: HashMap<String, AgentCard>,
}

/// A2A protocol client.
#[derive(Debug, Clone)]
pub struct A2aClient {
    http: reqwest::Client,
}

impl A2aClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { http })
    }

    pub fn with_default_timeout() -> Result<Self, ClientError> {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }

    /// Send `parts` to `target_url` as a `tasks/send` request and return the
    /// resulting task, whatever its state.
    pub async fn call(
        &self,
        target_url: &str,
        parts: Vec<Part>,
        task_id: Option<String>,
    ) -> Result<Task, ClientError> {
        let endpoint = a2a_endpoint(target_url)?;
        let task_id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = JsonRpcRequest::tasks_send(&task_id, Message::user(parts));

        tracing::info!("A2A client: calling {} with task {}", endpoint, task_id);

        let response = self
            .http
            .post(&endpoint)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(&endpoint, e))?;

        let task = decode_task_response(status, &body)?;
        tracing::info!(
            "A2A client: task {} from {} is {}",
            task.id,
            endpoint,
            task.status.state
        );
        Ok(task)
    }

    /// Register `card` with the registry at `registry_url`.
    pub async fn register(&self, registry_url: &str, card: &AgentCard) -> Result<Task, ClientError> {
        card.validate_for_registration()?;
        let data = serde_json::to_value(card).map_err(DescriptorError::from)?;

        tracing::info!("A2A client: registering {} with {}", card.url, registry_url);
        self.call(registry_url, vec![Part::data(data)], None).await
    }

    /// Ask the registry for every agent advertising `skill_id`.
    ///
    /// An empty list is a legitimate answer, not an error.
    pub async fn discover(
        &self,
        registry_url: &str,
        skill_id: &str,
    ) -> Result<Vec<AgentCard>, ClientError> {
        if skill_id.trim().is_empty() {
            return Err(ClientError::EmptySkillId);
        }

        let query = serde_json::json!({ "skill_id": skill_id });
        let task = self
            .call(registry_url, vec![Part::data(query)], None)
            .await?;

        if !task.is_completed() {
            let message = task
                .status_text()
                .unwrap_or("Registry task did not complete successfully.")
                .to_string();
            tracing::warn!(
                "A2A client: discovery for '{}' ended {}: {}",
                skill_id,
                task.status.state,
                message
            );
            return Err(ClientError::TaskNotCompleted {
                state: task.status.state,
                message,
            });
        }

        let cards = cards_from_artifacts(&task.artifacts);
        tracing::info!(
            "A2A client: discovery for '{}' found {} agents",
            skill_id,
            cards.len()
        );
        Ok(cards)
    }

    /// Fetch the registry's `/agents` listing.
    pub async fn list_agents(
        &self,
        registry_url: &str,
    ) -> Result<HashMap<String, AgentCard>, ClientError> {
        let base = base_url(registry_url)?;
        let url = format!("{}/agents", base);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_transport(&url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(&url, e))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let listing: RegisteredAgents = serde_json::from_str(&body)
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
        Ok(listing.registered_agents)
    }
}

/// `{base}/a2a`, accepting either a bare base URL or one already ending in `/a2a`.
pub fn a2a_endpoint(target_url: &str) -> Result<String, ClientError> {
    let trimmed = target_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::EmptyUrl);
    }
    if trimmed.ends_with(A2A_PATH) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}{}", trimmed, A2A_PATH))
    }
}

fn base_url(url: &str) -> Result<&str, ClientError> {
    let trimmed = url.trim().trim_end_matches('/');
    let base = trimmed.strip_suffix(A2A_PATH).unwrap_or(trimmed);
    if base.is_empty() {
        return Err(ClientError::EmptyUrl);
    }
    Ok(base)
}

fn classify_transport(url: &str, err: reqwest::Error) -> ClientError {
    let url = url.to_string();
    if err.is_timeout() {
        tracing::warn!("A2A client: timeout calling {}", url);
        ClientError::Timeout { url }
    } else if err.is_connect() {
        tracing::warn!("A2A client: connection error calling {}: {}", url, err);
        ClientError::Connection {
            url,
            reason: err.to_string(),
        }
    } else {
        tracing::warn!("A2A client: request to {} failed: {}", url, err);
        ClientError::Transport {
            url,
            reason: err.to_string(),
        }
    }
}

/// Classify an HTTP response into a task or a [`ClientError`].
///
/// A non-2xx body that still carries a Task in `result` (an internal fault
/// on the remote side) is returned as that task.
pub fn decode_task_response(status: StatusCode, body: &str) -> Result<Task, ClientError> {
    if !status.is_success() {
        return match serde_json::from_str::<JsonRpcResponse>(body) {
            Ok(JsonRpcResponse {
                error: Some(err), ..
            }) => Err(ClientError::Protocol {
                code: err.code,
                message: err.message,
            }),
            Ok(JsonRpcResponse {
                result: Some(result),
                ..
            }) => match serde_json::from_value::<Task>(result) {
                Ok(task) => {
                    tracing::warn!(
                        "A2A client: HTTP {} carried task {} ({})",
                        status.as_u16(),
                        task.id,
                        task.status.state
                    );
                    Ok(task)
                }
                Err(_) => Err(ClientError::Http {
                    status: status.as_u16(),
                    body: body.to_string(),
                }),
            },
            _ => Err(ClientError::Http {
                status: status.as_u16(),
                body: body.to_string(),
            }),
        };
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ClientError::UnparsableBody(e.to_string()))?;
    let envelope: JsonRpcResponse = serde_json::from_value(value)
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    if let Some(err) = envelope.error {
        return Err(ClientError::Protocol {
            code: err.code,
            message: err.message,
        });
    }
    let result = envelope
        .result
        .ok_or_else(|| ClientError::MalformedResponse("missing 'result'".to_string()))?;
    serde_json::from_value(result).map_err(|e| ClientError::MalformedResponse(e.to_string()))
}

/// Every data artifact that decodes as an agent card. Others are logged and skipped.
fn cards_from_artifacts(artifacts: &[Part]) -> Vec<AgentCard> {
    artifacts
        .iter()
        .filter_map(Part::as_data)
        .filter(|data| data.is_object())
        .filter_map(|data| match serde_json::from_value::<AgentCard>(data.clone()) {
            Ok(card) => Some(card),
            Err(e) => {
                tracing::warn!("A2A client: skipping bad agent card artifact: {}", e);
                None
            }
        })
        .collect()
}
