//! Start-up registration with a registry, with bounded fixed-delay retries.
//!
//! Each attempt is a brand-new `tasks/send` call (and so a new task id).
//! Failure is logged and reported, never fatal to the serving process.

use crate::a2a::agent_card::AgentCard;
use crate::a2a::client::{A2aClient, ClientError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Fixed-delay retry policy: no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The registry answered with a `completed` task.
    Registered { attempts: u32 },
    /// Every attempt failed; the agent keeps running unregistered.
    Exhausted { attempts: u32 },
    /// Stopped early on an error retrying cannot fix.
    Aborted { attempts: u32, reason: String },
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }
}

/// Register `card` with the registry, retrying per `policy`.
pub async fn register_with_retry(
    client: &A2aClient,
    registry_url: &str,
    card: &AgentCard,
    policy: RetryPolicy,
) -> RegistrationOutcome {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        tracing::info!(
            "[{}] Registration attempt {}/{} to {}",
            card.name,
            attempt,
            max_attempts,
            registry_url
        );

        match client.register(registry_url, card).await {
            Ok(task) if task.is_completed() => {
                tracing::info!("[{}] Successfully registered with the registry", card.name);
                return RegistrationOutcome::Registered { attempts: attempt };
            }
            Ok(task) => {
                tracing::warn!(
                    "[{}] Registration failed (attempt {}): task {}: {}",
                    card.name,
                    attempt,
                    task.status.state,
                    task.status_text().unwrap_or("no status message")
                );
            }
            Err(e @ (ClientError::UnparsableBody(_) | ClientError::InvalidDescriptor(_))) => {
                tracing::error!(
                    "[{}] Registration aborted (attempt {}): {}",
                    card.name,
                    attempt,
                    e
                );
                return RegistrationOutcome::Aborted {
                    attempts: attempt,
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                tracing::warn!("[{}] Registration failed (attempt {}): {}", card.name, attempt, e);
            }
        }

        if attempt < max_attempts {
            tracing::info!(
                "[{}] Retrying registration in {:?}",
                card.name,
                policy.delay
            );
            tokio::time::sleep(policy.delay).await;
        }
    }

    tracing::error!("[{}] Max registration retries reached", card.name);
    RegistrationOutcome::Exhausted {
        attempts: max_attempts,
    }
}

/// Run [`register_with_retry`] on a background task so serving is never
/// blocked on the registry.
pub fn spawn_registration(
    client: A2aClient,
    registry_url: String,
    card: AgentCard,
    policy: RetryPolicy,
) -> JoinHandle<RegistrationOutcome> {
    tokio::spawn(async move { register_with_retry(&client, &registry_url, &card, policy).await })
}
