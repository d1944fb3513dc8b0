//! A2A wire types and the JSON-RPC 2.0 envelope codec.
//!
//! Request:  `{"jsonrpc":"2.0","method":"tasks/send","params":{"task":{..},"message":{..}},"id":..}`
//! Response: `{"jsonrpc":"2.0","result":<Task>,"id":..}` or
//!           `{"jsonrpc":"2.0","error":{"code":..,"message":..},"id":..}`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

pub const JSONRPC_VERSION: &str = "2.0";

/// The only method this protocol implements.
pub const METHOD_TASKS_SEND: &str = "tasks/send";

/// Task id used when an internal fault happens before the inbound id is known.
pub const UNKNOWN_TASK_ID: &str = "unknown-task-id";

/// JSON-RPC id used when an internal fault happens before the inbound id is known.
pub const UNKNOWN_REQUEST_ID: &str = "unknown-req-id";

const REQUIRED_FIELDS: [&str; 4] = ["jsonrpc", "method", "params", "id"];

/// JSON-RPC 2.0 error codes used by the protocol.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
}

// ─── Envelope ────────────────────────────────────────────────

/// Structural failure while decoding an inbound envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Parse error: Invalid JSON.")]
    Parse(#[source] serde_json::Error),

    #[error("Invalid Request: Missing JSON-RPC fields.")]
    MissingFields { id: Option<Value> },

    #[error("Invalid Request: Unsupported JSON-RPC version.")]
    UnsupportedVersion { id: Option<Value> },

    #[error("Invalid Request: 'method' must be a string.")]
    InvalidMethod { id: Option<Value> },
}

impl EnvelopeError {
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            _ => error_codes::INVALID_REQUEST,
        }
    }

    /// The request id to echo back, `null` when it could not be read.
    pub fn request_id(&self) -> Value {
        match self {
            Self::Parse(_) => Value::Null,
            Self::MissingFields { id }
            | Self::UnsupportedVersion { id }
            | Self::InvalidMethod { id } => id.clone().unwrap_or(Value::Null),
        }
    }
}

/// A decoded JSON-RPC request. `params` stays untyped until the method is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: Value,
}

impl JsonRpcRequest {
    /// Decode a raw body, checking the four mandatory fields and the version.
    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        let payload: Value = serde_json::from_slice(body).map_err(EnvelopeError::Parse)?;
        let Value::Object(mut fields) = payload else {
            return Err(EnvelopeError::MissingFields { id: None });
        };

        let id = fields.get("id").cloned();
        if !REQUIRED_FIELDS.iter().all(|key| fields.contains_key(*key)) {
            return Err(EnvelopeError::MissingFields { id });
        }
        if fields.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(EnvelopeError::UnsupportedVersion { id });
        }
        let method = match fields.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(EnvelopeError::InvalidMethod { id }),
        };

        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params: fields.remove("params").unwrap_or(Value::Null),
            id: fields.remove("id").unwrap_or(Value::Null),
        })
    }

    /// Build a `tasks/send` request with a fresh JSON-RPC id.
    pub fn tasks_send(task_id: &str, message: Message) -> Self {
        let params = SendTaskParams {
            task: TaskRef {
                id: Some(task_id.to_string()),
            },
            message,
        };
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: METHOD_TASKS_SEND.to_string(),
            params: serde_json::to_value(params).unwrap_or(Value::Null),
            id: Value::String(Uuid::new_v4().to_string()),
        }
    }

    /// Typed view of `params` for `tasks/send`.
    pub fn task_params(&self) -> Result<SendTaskParams, serde_json::Error> {
        SendTaskParams::deserialize(&self.params)
    }

    /// Best-effort read of `params.task.id`, used for fault responses.
    pub fn task_id_hint(&self) -> Option<String> {
        self.params.pointer("/task/id").and_then(id_string)
    }
}

/// `params` of a `tasks/send` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendTaskParams {
    #[serde(default)]
    pub task: TaskRef,
    #[serde(default)]
    pub message: Message,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Non-string ids (e.g. `42`) are kept in their JSON text form.
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(id_string(&Value::deserialize(deserializer)?))
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC response: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    /// Wrap a finalized task as a success response.
    pub fn task(id: Value, task: &Task) -> Result<Self, serde_json::Error> {
        Ok(Self::success(id, serde_json::to_value(task)?))
    }
}

// ─── Messages & Parts ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    /// Any other sender role. Accepted on decode, re-encoded as `"other"`.
    #[serde(other)]
    Other,
}

/// A typed fragment of a message or an artifact.
///
/// Decoding never fails on a well-formed JSON value: a part of another type
/// (e.g. `file`), or a `text`/`data` part without its payload, is kept
/// verbatim as [`Part::Other`] and re-encodes unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    Other(Value),
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        let typed = match value.get("type").and_then(Value::as_str) {
            Some("text") => value
                .get("text")
                .and_then(Value::as_str)
                .map(Self::text),
            Some("data") => value.get("data").cloned().map(Self::data),
            _ => None,
        };
        typed.unwrap_or(Self::Other(value))
    }
}

impl From<Part> for Value {
    fn from(part: Part) -> Self {
        match part {
            Part::Text { text } => json!({"type": "text", "text": text}),
            Part::Data { data } => json!({"type": "data", "data": data}),
            Part::Other(raw) => raw,
        }
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn data(data: Value) -> Self {
        Self::Data { data }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data { data } => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: Role,
    /// A non-array `parts` value decodes as no parts.
    #[serde(default, deserialize_with = "lenient_parts")]
    pub parts: Vec<Part>,
}

fn lenient_parts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Part>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(Part::from).collect(),
        _ => Vec::new(),
    })
}

impl Message {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::text(text)],
        }
    }
}

// ─── Tasks ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// RFC 3339 / ISO-8601 timestamp of the last state change.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// The single request/response unit exchanged between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Part>,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status.state == TaskState::Completed
    }

    /// First text part of the status message, if any.
    pub fn status_text(&self) -> Option<&str> {
        self.status
            .message
            .as_ref()
            .and_then(|m| m.parts.iter().find_map(Part::as_text))
    }
}

/// A task in `submitted` state. Finalizing consumes it, so a task is
/// completed or failed exactly once.
#[derive(Debug)]
pub struct PendingTask {
    task: Task,
}

impl PendingTask {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            task: Task {
                id: id.into(),
                status: TaskStatus {
                    state: TaskState::Submitted,
                    timestamp: now_timestamp(),
                    message: None,
                },
                artifacts: Vec::new(),
                history: Vec::new(),
                metadata: Map::new(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn complete(self, artifacts: Vec<Part>, message: Option<String>) -> Task {
        self.finish(TaskState::Completed, artifacts, message)
    }

    pub fn fail(self, message: impl Into<String>) -> Task {
        self.finish(TaskState::Failed, Vec::new(), Some(message.into()))
    }

    fn finish(mut self, state: TaskState, artifacts: Vec<Part>, message: Option<String>) -> Task {
        self.task.status = TaskStatus {
            state,
            timestamp: now_timestamp(),
            message: message.map(Message::agent_text),
        };
        self.task.artifacts = artifacts;
        self.task
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn valid_envelope() -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "tasks/send",
            "params": {
                "task": {"id": "task-1"},
                "message": {
                    "role": "user",
                    "parts": [
                        {"type": "text", "text": "find rust news"},
                        {"type": "data", "data": {"skill_id": "web_search"}}
                    ]
                }
            },
            "id": "req-1"
        })
    }

    #[test]
    fn test_decode_valid_envelope() {
        let body = serde_json::to_vec(&valid_envelope()).expect("json");
        let req = JsonRpcRequest::decode(&body).expect("decodes");

        assert_eq!(req.method, METHOD_TASKS_SEND);
        assert_eq!(req.id, json!("req-1"));
        assert_eq!(req.task_id_hint().as_deref(), Some("task-1"));

        let params = req.task_params().expect("params");
        assert_eq!(params.message.role, Role::User);
        assert_eq!(params.message.parts[0].as_text(), Some("find rust news"));
        assert_eq!(
            params.message.parts[1].as_data(),
            Some(&json!({"skill_id": "web_search"}))
        );

        // re-encoding reproduces an equivalent envelope
        assert_eq!(serde_json::to_value(&req).expect("encode"), valid_envelope());
    }

    #[rstest]
    #[case::missing_jsonrpc("jsonrpc")]
    #[case::missing_method("method")]
    #[case::missing_params("params")]
    #[case::missing_id("id")]
    fn test_decode_missing_field(#[case] field: &str) {
        let mut envelope = valid_envelope();
        envelope.as_object_mut().expect("object").remove(field);
        let body = serde_json::to_vec(&envelope).expect("json");

        let err = JsonRpcRequest::decode(&body).expect_err("must fail");
        assert!(matches!(err, EnvelopeError::MissingFields { .. }));
        assert_eq!(err.code(), error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_decode_wrong_version_keeps_request_id() {
        let mut envelope = valid_envelope();
        envelope["jsonrpc"] = json!("1.0");
        let body = serde_json::to_vec(&envelope).expect("json");

        let err = JsonRpcRequest::decode(&body).expect_err("must fail");
        assert!(matches!(err, EnvelopeError::UnsupportedVersion { .. }));
        assert_eq!(err.code(), -32600);
        assert_eq!(err.request_id(), json!("req-1"));
    }

    #[test]
    fn test_decode_unparsable_body() {
        let err = JsonRpcRequest::decode(b"{not json").expect_err("must fail");
        assert_eq!(err.code(), -32700);
        assert_eq!(err.request_id(), Value::Null);
        assert_eq!(err.to_string(), "Parse error: Invalid JSON.");
    }

    #[test]
    fn test_unknown_part_type_is_kept_verbatim() {
        let file = json!({"type": "file", "file": {"uri": "file:///tmp/x"}});
        let parts: Vec<Part> =
            serde_json::from_value(json!([file.clone(), {"type": "text", "text": "hi"}]))
                .expect("parts");
        assert_eq!(parts, vec![Part::Other(file.clone()), Part::text("hi")]);

        let encoded = serde_json::to_value(&parts).expect("encode");
        assert_eq!(encoded[0], file);
    }

    #[rstest]
    #[case::text_without_payload(json!({"type": "text"}))]
    #[case::text_not_a_string(json!({"type": "text", "text": 7}))]
    #[case::data_without_payload(json!({"type": "data"}))]
    #[case::no_type(json!({"text": "hi"}))]
    #[case::not_an_object(json!("hi"))]
    fn test_incomplete_parts_decode_as_other(#[case] raw: Value) {
        let part: Part = serde_json::from_value(raw.clone()).expect("never fails");
        assert_eq!(part, Part::Other(raw));
        assert_eq!(part.as_text(), None);
        assert_eq!(part.as_data(), None);
    }

    #[rstest]
    #[case::number(json!(42), Some("42"))]
    #[case::string(json!("t-1"), Some("t-1"))]
    #[case::null(json!(null), None)]
    fn test_task_id_is_stringified(#[case] id: Value, #[case] expected: Option<&str>) {
        let params = SendTaskParams::deserialize(&json!({
            "task": {"id": id},
            "message": {"role": "system", "parts": {"not": "a list"}}
        }))
        .expect("params");
        assert_eq!(params.task.id.as_deref(), expected);
        assert_eq!(params.message.role, Role::Other);
        assert!(params.message.parts.is_empty());
    }

    #[test]
    fn test_task_wire_shape() {
        let task = PendingTask::new("t-42").fail("boom");
        let value = serde_json::to_value(&task).expect("encode");

        assert_eq!(value["id"], "t-42");
        assert_eq!(value["status"]["state"], "failed");
        assert_eq!(value["status"]["message"]["role"], "agent");
        assert_eq!(value["status"]["message"]["parts"][0]["type"], "text");
        assert_eq!(value["status"]["message"]["parts"][0]["text"], "boom");
        assert_eq!(value["artifacts"], json!([]));
        assert_eq!(value["history"], json!([]));
        assert_eq!(value["metadata"], json!({}));
        assert!(
            chrono::DateTime::parse_from_rfc3339(
                value["status"]["timestamp"].as_str().expect("timestamp")
            )
            .is_ok()
        );
    }

    #[test]
    fn test_task_decode_is_lossless() {
        let task = PendingTask::new("t-7").complete(
            vec![
                Part::text("result"),
                Part::data(json!({"name": "W", "url": "http://w/a2a"})),
            ],
            Some("done".to_string()),
        );
        let encoded = serde_json::to_string(&task).expect("encode");
        let decoded: Task = serde_json::from_str(&encoded).expect("decode");

        assert_eq!(decoded, task);
        assert!(decoded.is_completed());
        assert_eq!(decoded.status_text(), Some("done"));
    }

    #[test]
    fn test_completed_without_message_omits_it() {
        let task = PendingTask::new("t-1").complete(vec![Part::text("ok")], None);
        let value = serde_json::to_value(&task).expect("encode");
        assert!(value["status"].get("message").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let resp = JsonRpcResponse::error(
            json!("r-1"),
            error_codes::METHOD_NOT_FOUND,
            "Method 'tasks/get' not implemented.",
        );
        assert_eq!(
            serde_json::to_value(&resp).expect("encode"),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method 'tasks/get' not implemented."},
                "id": "r-1"
            })
        );
    }

    #[test]
    fn test_tasks_send_builder() {
        let req = JsonRpcRequest::tasks_send("t-9", Message::user(vec![Part::text("hello")]));
        let value = serde_json::to_value(&req).expect("encode");

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "tasks/send");
        assert_eq!(value["params"]["task"]["id"], "t-9");
        assert_eq!(value["params"]["message"]["role"], "user");
        assert_eq!(
            value["params"]["message"]["parts"],
            json!([{"type": "text", "text": "hello"}])
        );
        assert!(value["id"].is_string());
    }
}
