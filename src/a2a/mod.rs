//! A2A (Agent-to-Agent) protocol layer.
//!
//! - Agent Card model and validation (`.well-known/agent.json`)
//! - JSON-RPC 2.0 envelope codec and the `tasks/send` Task shape
//! - In-memory registry with TTL expiry and skill-indexed discovery
//! - Dispatcher for registry and worker roles
//! - Outbound client, start-up registration, and orchestrator delegation
//! - HTTP server (axum)

pub mod types;
pub mod agent_card;
pub mod registry;
pub mod executor;
pub mod handler;
pub mod server;
pub mod client;
pub mod registration;
pub mod orchestrator;
