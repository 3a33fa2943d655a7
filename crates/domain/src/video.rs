//! Transcript value types shared between the caption extractor, the
//! transcript store, and the video-intelligence facade.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::AgentId;

/// Key for everything video-scoped: transcripts and explain sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoKey {
    pub agent_id: AgentId,
    pub video_id: String,
}

impl VideoKey {
    pub fn new(agent_id: impl Into<AgentId>, video_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            video_id: video_id.into(),
        }
    }
}

impl fmt::Display for VideoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.agent_id, self.video_id)
    }
}

/// One time-stamped span of caption text.
///
/// Sequences are kept sorted by `start_s`; overlap is permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start_s: f64, end_s: f64, text: impl Into<String>) -> Self {
        Self {
            start_s,
            end_s,
            text: text.into(),
        }
    }

    /// True when this segment overlaps the closed range `[start_s, end_s]`.
    pub fn overlaps(&self, start_s: f64, end_s: f64) -> bool {
        self.end_s >= start_s && self.start_s <= end_s
    }
}

/// What kind of single-shot explanation to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainMode {
    Summary,
    Explain,
}

impl ExplainMode {
    /// System instruction sent to the model for this mode.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Summary => {
                "Summarize the following video transcript in a few short paragraphs. \
                 Cover the main points in order."
            }
            Self::Explain => {
                "Explain the content of the following video transcript for a beginner. \
                 Assume no prior knowledge of the subject."
            }
        }
    }
}

impl fmt::Display for ExplainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => f.write_str("summary"),
            Self::Explain => f.write_str("explain"),
        }
    }
}
