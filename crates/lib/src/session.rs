//! Per-chat session affinity for Dialogflow CX.
//!
//! Each Telegram chat is pinned to one CX session id so the agent keeps its
//! conversational context across messages. Entries carry an expiry deadline
//! that is pushed forward on every message; expiry is checked lazily on
//! access and a background sweep removes entries nobody touched again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// One live session binding for a chat.
#[derive(Debug, Clone)]
struct SessionEntry {
    session_id: String,
    expires_at: Instant,
}

/// In-memory map of chat id to assigned session id with per-entry expiry.
///
/// At most one entry per chat id can be live at a time (HashMap key).
/// Overwriting `expires_at` under the write lock replaces the pending
/// expiration, so a refresh can never be deleted by a stale deadline.
pub struct SessionStore {
    ttl: Duration,
    /// Monotonic sequence appended to minted ids; the wall clock alone is not
    /// unique when an entry is replaced within the millisecond it was created.
    seq: AtomicU64,
    inner: Arc<RwLock<HashMap<i64, SessionEntry>>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seq: AtomicU64::new(0),
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Session time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve the session id for a chat, minting a fresh one when no live
    /// entry exists, and push the expiry deadline to now + TTL either way.
    ///
    /// The whole operation holds the write lock, so concurrent calls for the
    /// same chat are serialized and always agree on one session id.
    pub async fn resolve(&self, chat_id: i64) -> String {
        let now = Instant::now();
        let mut g = self.inner.write().await;
        match g.get_mut(&chat_id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                entry.session_id.clone()
            }
            _ => {
                let session_id = self.new_session_id(chat_id);
                log::info!("created new session id for chat {}", chat_id);
                g.insert(
                    chat_id,
                    SessionEntry {
                        session_id: session_id.clone(),
                        expires_at: now + self.ttl,
                    },
                );
                session_id
            }
        }
    }

    /// Drop all expired entries; returns how many were removed.
    /// Called periodically by the gateway's sweep task.
    pub async fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut g = self.inner.write().await;
        let before = g.len();
        g.retain(|chat_id, entry| {
            let live = entry.expires_at > now;
            if !live {
                log::info!("session expired for chat {}", chat_id);
            }
            live
        });
        before - g.len()
    }

    /// Number of entries currently held (live or awaiting sweep).
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Session ids are unique per chat and creation time so a chat that comes
    /// back after expiry starts a fresh CX conversation. The sequence suffix
    /// keeps ids distinct even when expiry and re-creation land on the same
    /// wall-clock millisecond.
    fn new_session_id(&self, chat_id: i64) -> String {
        format!(
            "telegram-{}-{}-{}",
            chat_id,
            chrono::Utc::now().timestamp_millis(),
            self.seq.fetch_add(1, Ordering::Relaxed)
        )
    }
}
