//! JSON-RPC 2.0 dispatcher for A2A `tasks/send`.
//!
//! Every inbound body ends in exactly one response:
//! - undecodable envelope → JSON-RPC error (`-32700` / `-32600`, HTTP 400)
//! - unknown method       → JSON-RPC error (`-32601`, HTTP 501)
//! - `tasks/send`         → a finalized Task (HTTP 200)
//! - internal fault       → a `failed` Task (HTTP 500)
//!
//! A registry dispatcher handles registration and discovery payloads; a
//! worker dispatcher hands the first text part to its [`TaskExecutor`].

use crate::a2a::agent_card::AgentCard;
use crate::a2a::executor::TaskExecutor;
use crate::a2a::registry::RegistryStore;
use crate::a2a::types::*;
use axum::http::StatusCode;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use uuid::Uuid;

const REGISTERED_TEXT: &str = "Agent registered successfully.";
const INVALID_QUERY_TEXT: &str =
    "Invalid discovery query: 'skill_id' (string) is required in data part.";
const UNRECOGNIZED_REGISTRY_TEXT: &str = "Could not determine intended operation or missing \
     required data. Use DataPart for agent card (register) or {'skill_id': '...'} (discover).";
const MISSING_TEXT_PART_TEXT: &str = "Required 'text' part missing in the input message.";

/// What a `tasks/send` message asks for, decided from its parts up front.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    /// A data part shaped like an agent card (`url`, `skills`, `name`).
    Registration(Value),
    /// A data part carrying a `skill_id` key. The value is not yet validated.
    Discovery { skill_id: Value },
    /// The first text part, for the executor.
    Execution(String),
    Unrecognized,
}

impl TaskRequest {
    /// Registry classification: first data part that is a card or a query wins.
    pub fn for_registry(parts: &[Part]) -> Self {
        parts
            .iter()
            .filter_map(|part| part.as_data().and_then(Value::as_object))
            .find_map(|data| {
                if ["url", "skills", "name"].iter().all(|k| data.contains_key(*k)) {
                    Some(Self::Registration(Value::Object(data.clone())))
                } else {
                    data.get("skill_id").map(|skill_id| Self::Discovery {
                        skill_id: skill_id.clone(),
                    })
                }
            })
            .unwrap_or(Self::Unrecognized)
    }

    /// Worker classification: the first text part is the task input.
    pub fn for_worker(parts: &[Part]) -> Self {
        parts
            .iter()
            .find_map(Part::as_text)
            .map(|text| Self::Execution(text.to_string()))
            .unwrap_or(Self::Unrecognized)
    }
}

/// What the dispatcher serves.
#[derive(Clone)]
pub enum Role {
    Registry(RegistryStore),
    Worker(Arc<dyn TaskExecutor>),
}

/// A response body plus the HTTP status it travels with.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub status: StatusCode,
    pub response: JsonRpcResponse,
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error("invalid tasks/send params: {0}")]
    Params(#[source] serde_json::Error),

    #[error("failed to encode artifact: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Clone)]
pub struct Dispatcher {
    role: Role,
}

impl Dispatcher {
    pub fn registry(store: RegistryStore) -> Self {
        Self {
            role: Role::Registry(store),
        }
    }

    pub fn worker(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            role: Role::Worker(executor),
        }
    }

    pub fn registry_store(&self) -> Option<&RegistryStore> {
        match &self.role {
            Role::Registry(store) => Some(store),
            Role::Worker(_) => None,
        }
    }

    /// Handle one raw request body.
    pub async fn handle(&self, body: &[u8]) -> Dispatched {
        let request = match JsonRpcRequest::decode(body) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("A2A: rejected envelope: {}", e);
                return Dispatched {
                    status: StatusCode::BAD_REQUEST,
                    response: JsonRpcResponse::error(e.request_id(), e.code(), e.to_string()),
                };
            }
        };

        if request.method != METHOD_TASKS_SEND {
            tracing::warn!("A2A: method '{}' not implemented", request.method);
            return Dispatched {
                status: StatusCode::NOT_IMPLEMENTED,
                response: JsonRpcResponse::error(
                    request.id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method '{}' not implemented.", request.method),
                ),
            };
        }

        let outcome = AssertUnwindSafe(self.send_task(&request))
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(task)) => match JsonRpcResponse::task(request.id.clone(), &task) {
                Ok(response) => {
                    return Dispatched {
                        status: StatusCode::OK,
                        response,
                    };
                }
                Err(e) => e.to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        internal_failure(&request, &fault)
    }

    /// `tasks/send`: create the task, route it by role, finalize it.
    async fn send_task(&self, request: &JsonRpcRequest) -> Result<Task, DispatchError> {
        let params = request.task_params().map_err(DispatchError::Params)?;
        let task_id = params
            .task
            .id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let pending = PendingTask::new(task_id);
        let parts = &params.message.parts;

        match &self.role {
            Role::Registry(store) => match TaskRequest::for_registry(parts) {
                TaskRequest::Registration(data) => Ok(register_agent(store, pending, data).await),
                TaskRequest::Discovery { skill_id } => {
                    discover_agents(store, pending, &skill_id).await
                }
                _ => {
                    tracing::warn!(
                        "A2A: no registration or discovery data in task {}",
                        pending.id()
                    );
                    Ok(pending.fail(UNRECOGNIZED_REGISTRY_TEXT))
                }
            },
            Role::Worker(executor) => match TaskRequest::for_worker(parts) {
                TaskRequest::Execution(input) => {
                    Ok(execute_task(executor.as_ref(), pending, &input).await)
                }
                _ => {
                    tracing::warn!("A2A: no text part in task {}", pending.id());
                    Ok(pending.fail(MISSING_TEXT_PART_TEXT))
                }
            },
        }
    }
}

async fn register_agent(store: &RegistryStore, pending: PendingTask, data: Value) -> Task {
    tracing::info!("A2A: registration request for task {}", pending.id());

    let result = match AgentCard::from_value(data) {
        Ok(card) => store.upsert(card).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => pending.complete(Vec::new(), Some(REGISTERED_TEXT.to_string())),
        Err(e) => {
            tracing::warn!("A2A: invalid agent card in task {}: {}", pending.id(), e);
            pending.fail(format!("Invalid Agent Card format: {}", e))
        }
    }
}

async fn discover_agents(
    store: &RegistryStore,
    pending: PendingTask,
    skill_id: &Value,
) -> Result<Task, DispatchError> {
    let Some(skill_id) = skill_id.as_str().filter(|s| !s.is_empty()) else {
        return Ok(pending.fail(INVALID_QUERY_TEXT));
    };

    let artifacts = store
        .discover_by_skill(skill_id)
        .await
        .iter()
        .map(|card| serde_json::to_value(card).map(Part::data))
        .collect::<Result<Vec<_>, _>>()
        .map_err(DispatchError::Encode)?;

    Ok(pending.complete(artifacts, None))
}

async fn execute_task(executor: &dyn TaskExecutor, pending: PendingTask, input: &str) -> Task {
    tracing::info!("A2A: executing task {} ({} chars of input)", pending.id(), input.len());

    match executor.execute(input).await {
        Ok(output) => pending.complete(vec![Part::text(output)], None),
        Err(e) => {
            tracing::warn!("A2A: task {} failed: {}", pending.id(), e);
            pending.fail(format!("Agent execution error: {}", e))
        }
    }
}

/// Downgrade an internal fault into a `failed` task, HTTP 500.
fn internal_failure(request: &JsonRpcRequest, fault: &str) -> Dispatched {
    tracing::error!("A2A: internal error while dispatching: {}", fault);

    let task_id = request
        .task_id_hint()
        .unwrap_or_else(|| UNKNOWN_TASK_ID.to_string());
    let request_id = match &request.id {
        Value::Null => Value::String(UNKNOWN_REQUEST_ID.to_string()),
        id => id.clone(),
    };
    let task = PendingTask::new(task_id).fail(format!("Internal server error: {}", fault));

    let response = JsonRpcResponse::task(request_id.clone(), &task).unwrap_or_else(|e| {
        JsonRpcResponse::error(request_id, error_codes::INTERNAL_ERROR, e.to_string())
    });
    Dispatched {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        response,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task handler panicked".to_string()
    }
}
