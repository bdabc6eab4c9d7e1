//! Single-use upload tokens.
//!
//! Tokens are issued over the realtime channel, die after a fixed idle
//! period unless pinged, and are spent by the first upload that presents
//! them. All state is in-process; a server restart invalidates every
//! outstanding token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Length of a token in hex characters.
pub const TOKEN_LENGTH: usize = 64;

struct TokenEntry {
    owner: String,
    /// Bumped on every ping so a stale expiry timer cannot remove a
    /// refreshed token.
    generation: u64,
    timer: JoinHandle<()>,
}

/// In-memory store of live upload tokens.
#[derive(Clone)]
pub struct UploadTokenStore {
    inner: Arc<Mutex<HashMap<String, TokenEntry>>>,
    ttl: Duration,
}

impl UploadTokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a fresh token bound to `owner`, valid for one upload within
    /// the idle period.
    pub async fn issue(&self, owner: &str) -> String {
        let token = generate_token();
        let entry = TokenEntry {
            owner: owner.to_string(),
            generation: 0,
            timer: self.spawn_expiry(token.clone(), 0),
        };

        let mut guard = self.inner.lock().await;
        guard.insert(token.clone(), entry);
        drop(guard);

        tracing::debug!(owner = %owner, "Issued upload token");
        token
    }

    /// Reset the idle timer on a live token. Unknown or malformed tokens
    /// are ignored.
    pub async fn ping(&self, token: &str) -> bool {
        if !is_well_formed(token) {
            return false;
        }

        let mut guard = self.inner.lock().await;
        let entry = match guard.get_mut(token) {
            Some(entry) => entry,
            None => return false,
        };

        entry.timer.abort();
        entry.generation += 1;
        entry.timer = self.spawn_expiry(token.to_string(), entry.generation);
        true
    }

    /// Spend a token, resolving it to its owner. Each token resolves
    /// exactly once; a second call with the same token returns `None`.
    pub async fn consume(&self, token: &str) -> Option<String> {
        if !is_well_formed(token) {
            return None;
        }

        let mut guard = self.inner.lock().await;
        let entry = guard.remove(token)?;
        drop(guard);

        entry.timer.abort();
        tracing::debug!(owner = %entry.owner, "Upload token consumed");
        Some(entry.owner)
    }

    #[cfg(test)]
    async fn active_count(&self) -> usize {
        self.inner.lock().await.len()
    }

    fn spawn_expiry(&self, token: String, generation: u64) -> JoinHandle<()> {
        // Anchor the deadline now, not at the task's first poll, so the
        // idle period starts when the token is issued or pinged.
        let deadline = tokio::time::Instant::now() + self.ttl;
        let map = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let map = match map.upgrade() {
                Some(map) => map,
                None => return,
            };

            let mut guard = map.lock().await;
            // A ping may have raced this timer; only the newest timer for
            // the entry is allowed to expire it.
            let expired = guard
                .get(&token)
                .is_some_and(|entry| entry.generation == generation);
            if expired {
                guard.remove(&token);
                tracing::debug!("Upload token expired");
            }
        })
    }
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; TOKEN_LENGTH / 2] = rng.random();
    hex::encode(bytes)
}

/// Cheap shape check done before touching the map, so arbitrary request
/// strings never become lookup keys.
fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_hexdigit())
}
