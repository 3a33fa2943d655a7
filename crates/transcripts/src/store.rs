//! In-memory transcript store.
//!
//! Keyed `(agent_id, video_id)`; a later capture for the same key
//! overwrites the earlier one (caption-track switches). The store is
//! deliberately not an index into the agent registry: entries for
//! destroyed agents persist until the scheduler evicts them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use sg_domain::{Segment, VideoKey};

/// One captured transcript.
#[derive(Debug, Clone, Serialize)]
pub struct StoredTranscript {
    pub key: VideoKey,
    pub language: Option<String>,
    /// Sorted by `start_s`; overlap permitted.
    pub segments: Vec<Segment>,
    pub captured_at: DateTime<Utc>,
}

/// Thread-safe map of captured transcripts. Unbounded within a run;
/// reclamation is explicit.
pub struct TranscriptStore {
    inner: RwLock<HashMap<VideoKey, StoredTranscript>>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Store a capture, overwriting any previous transcript for the key.
    /// Segments are sorted by start time on the way in.
    pub fn put(&self, key: VideoKey, language: Option<String>, mut segments: Vec<Segment>) {
        segments.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
        tracing::debug!(key = %key, segments = segments.len(), "transcript stored");
        self.inner.write().insert(
            key.clone(),
            StoredTranscript {
                key,
                language,
                segments,
                captured_at: Utc::now(),
            },
        );
    }

    pub fn has(&self, key: &VideoKey) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn get(&self, key: &VideoKey) -> Option<StoredTranscript> {
        self.inner.read().get(key).cloned()
    }

    /// All segment texts in order, joined by a single space. Empty
    /// string for empty or missing transcripts.
    pub fn full_text(&self, key: &VideoKey) -> String {
        let inner = self.inner.read();
        match inner.get(key) {
            Some(t) => t
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        }
    }

    /// Segments overlapping the closed range `[start_s, end_s]`.
    ///
    /// The upper bound is found by binary search on `start_s`; overlap
    /// against the lower bound is filtered from that slice.
    pub fn segments_in_range(&self, key: &VideoKey, start_s: f64, end_s: f64) -> Vec<Segment> {
        let inner = self.inner.read();
        let Some(transcript) = inner.get(key) else {
            return Vec::new();
        };

        let segments = &transcript.segments;
        let upper = segments.partition_point(|s| s.start_s <= end_s);
        segments[..upper]
            .iter()
            .filter(|s| s.overlaps(start_s, end_s))
            .cloned()
            .collect()
    }

    /// Remove one transcript. Idempotent.
    pub fn remove(&self, key: &VideoKey) -> bool {
        self.inner.write().remove(key).is_some()
    }

    /// Remove every transcript captured for an agent. Returns how many
    /// were evicted. Called by the scheduler on agent destruction.
    pub fn remove_agent(&self, agent_id: &str) -> usize {
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|k, _| k.agent_id != agent_id);
        let evicted = before - inner.len();
        if evicted > 0 {
            tracing::debug!(agent_id, evicted, "agent transcripts evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Keys currently held, in no particular order.
    pub fn keys(&self) -> Vec<VideoKey> {
        self.inner.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(agent: &str, video: &str) -> VideoKey {
        VideoKey::new(agent, video)
    }

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment::new(start, end, text)
    }

    #[test]
    fn put_get_roundtrip() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(k.clone(), Some("en".into()), vec![seg(0.0, 2.0, "hi")]);

        assert!(store.has(&k));
        let stored = store.get(&k).unwrap();
        assert_eq!(stored.language.as_deref(), Some("en"));
        assert_eq!(stored.segments.len(), 1);
        assert!(!store.has(&key("a1", "v2")));
    }

    #[test]
    fn later_capture_overwrites() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(k.clone(), Some("en".into()), vec![seg(0.0, 2.0, "english")]);
        store.put(k.clone(), Some("fr".into()), vec![seg(0.0, 2.0, "français")]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&k).unwrap().language.as_deref(), Some("fr"));
    }

    #[test]
    fn segments_are_sorted_on_insert() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(
            k.clone(),
            None,
            vec![seg(4.0, 5.0, "b"), seg(1.0, 2.0, "a")],
        );
        let stored = store.get(&k).unwrap();
        assert_eq!(stored.segments[0].text, "a");
        assert_eq!(stored.segments[1].text, "b");
    }

    #[test]
    fn full_text_joins_with_single_space() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(
            k.clone(),
            None,
            vec![seg(0.0, 1.0, "hello"), seg(1.0, 2.0, "there"), seg(2.0, 3.0, "world")],
        );
        assert_eq!(store.full_text(&k), "hello there world");
    }

    #[test]
    fn empty_transcript_boundary_behavior() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(k.clone(), None, vec![]);

        assert!(store.has(&k));
        assert_eq!(store.full_text(&k), "");
        assert!(store.segments_in_range(&k, 0.0, f64::MAX).is_empty());
        assert!(store.segments_in_range(&k, -10.0, 10.0).is_empty());
    }

    #[test]
    fn range_query_returns_overlapping_segments() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(
            k.clone(),
            None,
            vec![
                seg(0.0, 5.0, "a"),
                seg(5.0, 10.0, "b"),
                seg(10.0, 15.0, "c"),
                seg(15.0, 20.0, "d"),
            ],
        );

        let hits = store.segments_in_range(&k, 6.0, 12.0);
        let texts: Vec<&str> = hits.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);

        // Boundary touch counts as overlap.
        let hits = store.segments_in_range(&k, 5.0, 5.0);
        let texts: Vec<&str> = hits.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);

        assert!(store.segments_in_range(&k, 30.0, 40.0).is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = TranscriptStore::new();
        let k = key("a1", "v1");
        store.put(k.clone(), None, vec![]);
        assert!(store.remove(&k));
        assert!(!store.remove(&k));
    }

    #[test]
    fn remove_agent_evicts_only_that_agent() {
        let store = TranscriptStore::new();
        store.put(key("a1", "v1"), None, vec![]);
        store.put(key("a1", "v2"), None, vec![]);
        store.put(key("a2", "v1"), None, vec![]);

        assert_eq!(store.remove_agent("a1"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.has(&key("a2", "v1")));
        assert_eq!(store.remove_agent("a1"), 0);
    }
}
