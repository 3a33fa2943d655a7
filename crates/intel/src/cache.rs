//! Bounded, time-expiring explain-session cache.
//!
//! Holds at most M sessions; every use touches the session. Eviction on
//! each `ensure`: expired sessions first (idle ≥ T), then LRU by last
//! touch until there is room. Each key also owns a `Semaphore(1)` so at
//! most one LLM round-trip is in flight per key at a time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use sg_domain::trace::TraceEvent;
use sg_domain::{ExplainMode, VideoKey};

use crate::traits::ChatTurn;

/// One cached conversational context.
#[derive(Debug, Clone)]
pub struct ExplainSession {
    pub key: VideoKey,
    pub created_at: DateTime<Utc>,
    pub last_touched_at: DateTime<Utc>,
    /// `(user, question), (model, answer)` pairs, in ask order.
    pub history: Vec<ChatTurn>,
    /// Mode → last produced single-shot explanation.
    pub explanation_cache: HashMap<ExplainMode, String>,
}

struct Entry {
    session: ExplainSession,
    /// Per-key critical section around the LLM round-trip.
    lock: Arc<Semaphore>,
}

/// The session cache. All operations are short; the per-key semaphore
/// is what callers hold across LLM awaits, never this mutex.
pub struct SessionCache {
    max_sessions: usize,
    timeout: Duration,
    inner: Mutex<HashMap<VideoKey, Entry>>,
}

impl SessionCache {
    pub fn new(max_sessions: usize, timeout_mins: u64) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            timeout: Duration::minutes(timeout_mins.max(1) as i64),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Run eviction, create the session if absent, touch it, and return
    /// its round-trip lock.
    pub fn ensure(&self, key: &VideoKey) -> Arc<Semaphore> {
        self.ensure_at(key, Utc::now())
    }

    pub(crate) fn ensure_at(&self, key: &VideoKey, now: DateTime<Utc>) -> Arc<Semaphore> {
        let mut inner = self.inner.lock();

        // 1. Expire idle sessions.
        let timeout = self.timeout;
        inner.retain(|k, entry| {
            let keep = now.signed_duration_since(entry.session.last_touched_at) < timeout;
            if !keep {
                TraceEvent::SessionEvicted {
                    agent_id: k.agent_id.clone(),
                    video_id: k.video_id.clone(),
                    reason: "expired".into(),
                }
                .emit();
            }
            keep
        });

        // 2. Make room by LRU when the key needs a fresh slot.
        while inner.len() >= self.max_sessions && !inner.contains_key(key) {
            let Some(lru) = inner
                .iter()
                .min_by_key(|(_, e)| e.session.last_touched_at)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            inner.remove(&lru);
            TraceEvent::SessionEvicted {
                agent_id: lru.agent_id.clone(),
                video_id: lru.video_id.clone(),
                reason: "lru".into(),
            }
            .emit();
        }

        // 3. Create if absent, touch either way.
        let entry = inner.entry(key.clone()).or_insert_with(|| {
            TraceEvent::SessionCreated {
                agent_id: key.agent_id.clone(),
                video_id: key.video_id.clone(),
            }
            .emit();
            Entry {
                session: ExplainSession {
                    key: key.clone(),
                    created_at: now,
                    last_touched_at: now,
                    history: Vec::new(),
                    explanation_cache: HashMap::new(),
                },
                lock: Arc::new(Semaphore::new(1)),
            }
        });
        entry.session.last_touched_at = now;
        entry.lock.clone()
    }

    /// Update the last-touch timestamp of an existing session.
    pub fn touch(&self, key: &VideoKey) {
        if let Some(entry) = self.inner.lock().get_mut(key) {
            entry.session.last_touched_at = Utc::now();
        }
    }

    /// Cached single-shot explanation for a mode, if any.
    pub fn cached_explanation(&self, key: &VideoKey, mode: ExplainMode) -> Option<String> {
        self.inner
            .lock()
            .get(key)
            .and_then(|e| e.session.explanation_cache.get(&mode).cloned())
    }

    /// Store a produced explanation and touch the session.
    pub fn store_explanation(&self, key: &VideoKey, mode: ExplainMode, text: String) {
        if let Some(entry) = self.inner.lock().get_mut(key) {
            entry.session.explanation_cache.insert(mode, text);
            entry.session.last_touched_at = Utc::now();
        }
    }

    /// Append one question/answer pair and touch the session.
    pub fn append_turns(&self, key: &VideoKey, question: String, answer: String) {
        if let Some(entry) = self.inner.lock().get_mut(key) {
            entry.session.history.push(ChatTurn::user(question));
            entry.session.history.push(ChatTurn::model(answer));
            entry.session.last_touched_at = Utc::now();
        }
    }

    /// Snapshot of a session's history.
    pub fn history(&self, key: &VideoKey) -> Vec<ChatTurn> {
        self.inner
            .lock()
            .get(key)
            .map(|e| e.session.history.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &VideoKey) -> Option<ExplainSession> {
        self.inner.lock().get(key).map(|e| e.session.clone())
    }

    pub fn contains(&self, key: &VideoKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn remove(&self, key: &VideoKey) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(video: &str) -> VideoKey {
        VideoKey::new("a1", video)
    }

    #[test]
    fn ensure_creates_and_reuses() {
        let cache = SessionCache::new(10, 30);
        cache.ensure(&key("v1"));
        assert_eq!(cache.len(), 1);

        cache.append_turns(&key("v1"), "q".into(), "a".into());
        cache.ensure(&key("v1"));
        // Reused, not recreated.
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.history(&key("v1")).len(), 2);
    }

    #[test]
    fn expired_sessions_are_evicted_before_size_check() {
        let cache = SessionCache::new(10, 1);
        let t0 = Utc::now();
        cache.ensure_at(&key("old"), t0);
        assert_eq!(cache.len(), 1);

        // 61 seconds later the old session is past the 1-minute timeout.
        cache.ensure_at(&key("new"), t0 + Duration::seconds(61));
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(&key("old")));
        assert!(cache.contains(&key("new")));
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let cache = SessionCache::new(2, 10_000);
        let t0 = Utc::now();
        cache.ensure_at(&key("k1"), t0);
        cache.ensure_at(&key("k2"), t0 + Duration::seconds(1));
        cache.ensure_at(&key("k3"), t0 + Duration::seconds(2));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key("k1")));
        assert!(cache.contains(&key("k2")));
        assert!(cache.contains(&key("k3")));
    }

    #[test]
    fn fresh_entries_still_admit_new_key_by_lru() {
        // All entries within the timeout; capacity pressure alone evicts.
        let cache = SessionCache::new(3, 10_000);
        let t0 = Utc::now();
        for (i, k) in ["k1", "k2", "k3"].iter().enumerate() {
            cache.ensure_at(&key(k), t0 + Duration::seconds(i as i64));
        }
        cache.ensure_at(&key("k4"), t0 + Duration::seconds(10));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key("k1")));
        assert!(cache.contains(&key("k4")));
    }

    #[test]
    fn touching_protects_from_lru() {
        let cache = SessionCache::new(2, 10_000);
        let t0 = Utc::now();
        cache.ensure_at(&key("k1"), t0);
        cache.ensure_at(&key("k2"), t0 + Duration::seconds(1));
        // Re-touch k1 so k2 becomes the LRU.
        cache.ensure_at(&key("k1"), t0 + Duration::seconds(2));

        cache.ensure_at(&key("k3"), t0 + Duration::seconds(3));
        assert!(cache.contains(&key("k1")));
        assert!(!cache.contains(&key("k2")));
    }

    #[test]
    fn ensure_on_existing_key_does_not_evict_others() {
        let cache = SessionCache::new(2, 10_000);
        let t0 = Utc::now();
        cache.ensure_at(&key("k1"), t0);
        cache.ensure_at(&key("k2"), t0 + Duration::seconds(1));
        // At capacity, but k1 already has a slot.
        cache.ensure_at(&key("k1"), t0 + Duration::seconds(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key("k2")));
    }

    #[test]
    fn explanation_cache_is_per_mode() {
        let cache = SessionCache::new(10, 30);
        cache.ensure(&key("v1"));
        cache.store_explanation(&key("v1"), ExplainMode::Summary, "short".into());

        assert_eq!(
            cache.cached_explanation(&key("v1"), ExplainMode::Summary),
            Some("short".into())
        );
        assert_eq!(cache.cached_explanation(&key("v1"), ExplainMode::Explain), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let cache = SessionCache::new(10, 30);
        cache.ensure(&key("v1"));
        assert!(cache.remove(&key("v1")));
        assert!(!cache.remove(&key("v1")));
    }

    #[tokio::test]
    async fn per_key_lock_serializes() {
        let cache = Arc::new(SessionCache::new(10, 30));
        let lock = cache.ensure(&key("v1"));

        let permit = lock.clone().acquire_owned().await.unwrap();
        assert_eq!(lock.available_permits(), 0);

        // A second ensure returns the same semaphore.
        let lock2 = cache.ensure(&key("v1"));
        assert_eq!(lock2.available_permits(), 0);

        drop(permit);
        assert_eq!(lock2.available_permits(), 1);
    }
}
