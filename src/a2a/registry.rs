//! In-memory agent registry with TTL expiry.
//!
//! Entries are keyed by card URL. Expired entries are pruned lazily at the
//! start of every read or write; there is no background sweeper, so an
//! entry disappears at the first registry access after its TTL elapses.

use crate::a2a::agent_card::{AgentCard, DescriptorError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_AGENT_TTL: Duration = Duration::from_secs(300);

/// A registered card plus the time it last (re-)registered.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub card: AgentCard,
    pub last_seen: DateTime<Utc>,
}

impl RegistryEntry {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        // A last_seen in the future yields a negative age and never expires.
        (now - self.last_seen)
            .to_std()
            .is_ok_and(|age| age > ttl)
    }
}

/// Shared registry handle. Cloning shares the underlying map.
///
/// One coarse lock serializes every logical operation.
#[derive(Clone)]
pub struct RegistryStore {
    entries: Arc<Mutex<HashMap<String, RegistryEntry>>>,
    ttl: Duration,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_TTL)
    }
}

impl RegistryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or replace the card keyed by its URL and refresh `last_seen`.
    pub async fn upsert(&self, card: AgentCard) -> Result<(), DescriptorError> {
        self.upsert_at(card, Utc::now()).await
    }

    pub async fn upsert_at(&self, card: AgentCard, now: DateTime<Utc>) -> Result<(), DescriptorError> {
        let mut entries = self.entries.lock().await;
        prune_locked(&mut entries, now, self.ttl);

        card.validate()?;
        let url = card.url.clone();
        let name = card.name.clone();
        let replaced = entries
            .insert(url.clone(), RegistryEntry { card, last_seen: now })
            .is_some();

        if replaced {
            tracing::info!("Registry: updated agent {} at {}", name, url);
        } else {
            tracing::info!("Registry: registered agent {} at {}", name, url);
        }
        Ok(())
    }

    /// Remove every entry idle for longer than the TTL. Returns how many went.
    pub async fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        prune_locked(&mut entries, now, self.ttl)
    }

    /// All live cards advertising `skill_id`, in map iteration order.
    pub async fn discover_by_skill(&self, skill_id: &str) -> Vec<AgentCard> {
        self.discover_by_skill_at(skill_id, Utc::now()).await
    }

    pub async fn discover_by_skill_at(&self, skill_id: &str, now: DateTime<Utc>) -> Vec<AgentCard> {
        let mut entries = self.entries.lock().await;
        prune_locked(&mut entries, now, self.ttl);

        let matches: Vec<AgentCard> = entries
            .values()
            .filter(|entry| entry.card.has_skill(skill_id))
            .map(|entry| entry.card.clone())
            .collect();

        tracing::info!(
            "Registry: discovery for skill '{}' found {} agents",
            skill_id,
            matches.len()
        );
        matches
    }

    /// Snapshot of all live cards keyed by URL.
    pub async fn list(&self) -> HashMap<String, AgentCard> {
        self.list_at(Utc::now()).await
    }

    pub async fn list_at(&self, now: DateTime<Utc>) -> HashMap<String, AgentCard> {
        let mut entries = self.entries.lock().await;
        prune_locked(&mut entries, now, self.ttl);

        entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.card.clone()))
            .collect()
    }

    /// Snapshot of a single entry, including its `last_seen` time.
    pub async fn entry(&self, url: &str) -> Option<RegistryEntry> {
        self.entries.lock().await.get(url).cloned()
    }
}

fn prune_locked(entries: &mut HashMap<String, RegistryEntry>, now: DateTime<Utc>, ttl: Duration) -> usize {
    let before = entries.len();
    entries.retain(|url, entry| {
        let expired = entry.is_expired(now, ttl);
        if expired {
            tracing::info!("Registry: pruned expired agent {}", url);
        }
        !expired
    });
    let pruned = before - entries.len();
    if pruned > 0 {
        tracing::info!("Registry: pruned {} expired agents", pruned);
    }
    pruned
}
