//! The video-intelligence facade.
//!
//! One interface for the UI: `explain(agent, video, mode)` and
//! `ask(agent, video, question)`. The transcript is looked up by key on
//! every call, never held by reference, so transcript eviction leaves
//! a stale session that simply refuses further work.

use std::sync::Arc;

use sg_domain::config::IntelConfig;
use sg_domain::{Error, ExplainMode, Result, VideoKey};
use sg_transcripts::TranscriptStore;

use crate::cache::SessionCache;
use crate::traits::LanguageModel;

const ASK_INSTRUCTION: &str =
    "You are answering questions about a video using its transcript. \
     Answer from the transcript; say so when it does not contain the answer.";

/// Explain and ask against captured transcripts.
pub struct VideoIntelligence {
    store: Arc<TranscriptStore>,
    cache: SessionCache,
    llm: Arc<dyn LanguageModel>,
}

impl VideoIntelligence {
    pub fn new(store: Arc<TranscriptStore>, llm: Arc<dyn LanguageModel>, cfg: &IntelConfig) -> Self {
        Self {
            store,
            cache: SessionCache::new(cfg.max_sessions, cfg.session_timeout_mins),
            llm,
        }
    }

    /// Produce (or return the cached) single-shot explanation for a
    /// video the agent is displaying.
    pub async fn explain(&self, agent_id: &str, video_id: &str, mode: ExplainMode) -> Result<String> {
        let key = VideoKey::new(agent_id, video_id);
        let transcript_text = self.require_transcript(&key)?;

        let lock = self.cache.ensure(&key);
        let _permit = lock
            .acquire()
            .await
            .map_err(|_| Error::Other("session lock closed".into()))?;

        // The transcript may have been evicted while we waited.
        self.require_transcript(&key)?;

        if let Some(cached) = self.cache.cached_explanation(&key, mode) {
            self.cache.touch(&key);
            return Ok(cached);
        }

        let answer = self
            .llm
            .generate(mode.instruction(), &[], &transcript_text)
            .await?;
        self.cache.store_explanation(&key, mode, answer.clone());
        Ok(answer)
    }

    /// Ask a follow-up question in the video's conversational session.
    pub async fn ask(&self, agent_id: &str, video_id: &str, question: &str) -> Result<String> {
        let key = VideoKey::new(agent_id, video_id);
        let transcript_text = self.require_transcript(&key)?;

        let lock = self.cache.ensure(&key);
        let _permit = lock
            .acquire()
            .await
            .map_err(|_| Error::Other("session lock closed".into()))?;

        self.require_transcript(&key)?;

        // The first turn of every session carries the transcript so
        // later turns need not resend it.
        let history = self.cache.history(&key);
        let prompt = if history.is_empty() {
            format!(
                "Here is the transcript of the video:\n\n{transcript_text}\n\nQuestion: {question}"
            )
        } else {
            question.to_owned()
        };

        let answer = self.llm.generate(ASK_INSTRUCTION, &history, &prompt).await?;
        self.cache.append_turns(&key, prompt, answer.clone());
        Ok(answer)
    }

    /// Drop the cached session for one key (e.g. after a transcript
    /// overwrite the UI wants to start fresh on).
    pub fn reset_session(&self, agent_id: &str, video_id: &str) -> bool {
        self.cache.remove(&VideoKey::new(agent_id, video_id))
    }

    pub fn session_count(&self) -> usize {
        self.cache.len()
    }

    fn require_transcript(&self, key: &VideoKey) -> Result<String> {
        if !self.store.has(key) {
            return Err(Error::TranscriptUnavailable {
                agent_id: key.agent_id.clone(),
                video_id: key.video_id.clone(),
            });
        }
        Ok(self.store.full_text(key))
    }
}
