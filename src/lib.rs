//! a2a-mesh: agent discovery and task delegation over the A2A protocol.
//!
//! Agents advertise an Agent Card, register it with a shared registry, and
//! discover peers by skill id. Work is dispatched as JSON-RPC `tasks/send`
//! requests whose responses always carry a finalized Task.

pub mod a2a;
pub mod config;
pub mod logging;

/// Crate version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
