//! Conversation session registry with idle eviction
//!
//! Sessions live only in memory. A background sweep evicts any session idle
//! past the inactivity threshold; eviction discards history, so a session
//! resumed afterwards starts empty. The map is a `DashMap` so a relay call's
//! lookup-and-append stays atomic with respect to a concurrent sweep.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SessionConfig;

/// Speaker role within a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
}

#[derive(Debug, Clone)]
struct ConversationSession {
    turns: Vec<Turn>,
    last_active: DateTime<Utc>,
}

/// Registry of active conversation sessions
pub struct SessionRegistry {
    sessions: DashMap<String, ConversationSession>,
    inactive_after: Duration,
    max_message_len: usize,
}

impl SessionRegistry {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            inactive_after: Duration::seconds(config.inactive_secs as i64),
            max_message_len: config.max_message_len,
        }
    }

    /// Append a turn, creating the session on first use and refreshing its
    /// activity timestamp. Messages are truncated to the configured maximum.
    pub fn append(&self, session_id: &str, role: Role, message: &str) {
        let message: String = message.chars().take(self.max_message_len).collect();
        let now = Utc::now();

        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationSession {
                turns: Vec::new(),
                last_active: now,
            });
        session.turns.push(Turn { role, message });
        session.last_active = now;
    }

    /// Prior turns for a session, oldest first; empty for an absent (or
    /// evicted) session
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    /// Number of active sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// One eviction pass: drop every session idle past the threshold.
    /// Returns the number evicted.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now - session.last_active <= self.inactive_after);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions", evicted);
        }
        evicted
    }

    /// Spawn the perpetual background sweep loop
    pub fn spawn_sweeper(self: &Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                registry.sweep_once(Utc::now());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(inactive_secs: u64) -> SessionRegistry {
        SessionRegistry::new(&SessionConfig {
            inactive_secs,
            sweep_interval_secs: 60,
            max_message_len: 4096,
        })
    }

    #[test]
    fn test_first_turn_creates_session() {
        let registry = registry(300);
        assert!(registry.history("s1").is_empty());

        registry.append("s1", Role::User, "hello");
        let history = registry.history("s1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "hello");
    }

    #[test]
    fn test_idle_session_evicted_active_retained() {
        let registry = registry(300);
        registry.append("idle", Role::User, "old message");
        registry.append("busy", Role::User, "question");
        registry.append("busy", Role::Assistant, "answer");

        // "idle" went quiet; "busy" stays within the threshold
        if let Some(mut session) = registry.sessions.get_mut("idle") {
            session.last_active = Utc::now() - Duration::seconds(301);
        }

        let evicted = registry.sweep_once(Utc::now());
        assert_eq!(evicted, 1);
        assert!(registry.history("idle").is_empty());

        let busy = registry.history("busy");
        assert_eq!(busy.len(), 2);
        assert_eq!(busy[1].role, Role::Assistant);
    }

    #[test]
    fn test_resumed_session_starts_empty_after_eviction() {
        let registry = registry(300);
        registry.append("s", Role::User, "before eviction");
        if let Some(mut session) = registry.sessions.get_mut("s") {
            session.last_active = Utc::now() - Duration::seconds(600);
        }
        registry.sweep_once(Utc::now());

        registry.append("s", Role::User, "after eviction");
        let history = registry.history("s");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "after eviction");
    }

    #[test]
    fn test_message_truncated_to_max_len() {
        let registry = SessionRegistry::new(&SessionConfig {
            inactive_secs: 300,
            sweep_interval_secs: 60,
            max_message_len: 8,
        });
        registry.append("s", Role::User, "0123456789abcdef");
        assert_eq!(registry.history("s")[0].message, "01234567");
    }
}
