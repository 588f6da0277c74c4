//! Response cache keyed by request fingerprint.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use waypoint_core::Invocation;

struct CachedInvocation {
    invocation: Invocation,
    stored_at: Instant,
}

/// Fingerprint → successful invocation, valid for a fixed TTL.
///
/// Expired entries are treated as absent and dropped on the lookup that
/// finds them; nothing sweeps in the background.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedInvocation>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Invocation> {
        let now = Instant::now();
        {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                Some(entry) if now - entry.stored_at < self.ttl => {
                    return Some(entry.invocation.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        debug!(key = %key, "Cache entry expired");
        if let Ok(mut entries) = self.entries.write() {
            // Re-check under the write lock; a fresh put may have landed.
            if entries
                .get(key)
                .is_some_and(|e| now - e.stored_at >= self.ttl)
            {
                entries.remove(key);
            }
        }
        None
    }

    /// Store or overwrite, restarting the entry's TTL.
    pub fn put(&self, key: impl Into<String>, invocation: Invocation) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key.into(),
                CachedInvocation {
                    invocation,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{ConversationContext, RunItem};

    fn invocation(text: &str) -> Invocation {
        Invocation {
            final_output: text.into(),
            items: vec![RunItem::message(text)],
            transcript: vec![],
            context: ConversationContext::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("k", invocation("hello"));
        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k").unwrap().final_output, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_absent_and_evicted() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.put("k", invocation("hello"));
        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_restarts_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.put("k", invocation("old"));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k", invocation("new"));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k").unwrap().final_output, "new");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = ResponseCache::new(Duration::from_secs(1));
        assert!(cache.get("nope").is_none());
    }
}
