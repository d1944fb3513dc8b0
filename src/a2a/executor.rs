//! The task executor collaborator.
//!
//! A worker agent hands the first text part of each task to its executor.
//! What the executor does with it (reasoning, tool calls) is outside this
//! crate; any error it returns becomes a `failed` task.

use async_trait::async_trait;

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one task to completion and return its text output.
    async fn execute(&self, input: &str) -> anyhow::Result<String>;
}
