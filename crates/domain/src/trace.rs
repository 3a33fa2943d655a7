use serde::Serialize;

/// Structured trace events emitted across all SurfGrid crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    RulesLoaded {
        source: String,
        rules: usize,
        skipped: usize,
    },
    RequestDecided {
        request_id: String,
        agent_id: String,
        host: String,
        blocked: bool,
        rule_id: Option<String>,
    },
    ResponseStripped {
        endpoint: String,
        fields: usize,
        bytes_removed: usize,
    },
    ManifestRewritten {
        kind: String,
        segments_removed: usize,
    },
    TranscriptCaptured {
        agent_id: String,
        video_id: String,
        segments: usize,
    },
    SessionCreated {
        agent_id: String,
        video_id: String,
    },
    SessionEvicted {
        agent_id: String,
        video_id: String,
        reason: String,
    },
    LlmRequest {
        model: String,
        mode: String,
        duration_ms: u64,
    },
    AgentPlaced {
        agent_id: String,
        slot: usize,
    },
    AgentDestroyed {
        agent_id: String,
        slot: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sg_event");
    }
}
