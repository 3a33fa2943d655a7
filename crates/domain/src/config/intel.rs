use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Video intelligence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration for the explain-session cache and the Gemini client.
///
/// The API key itself never appears here; only the name of the process
/// environment variable holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    /// Environment variable holding the Gemini API key. If the variable
    /// is unset, video intelligence is disabled and the rest of the
    /// workspace keeps working.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "d_base_url")]
    pub base_url: String,

    #[serde(default = "d_model")]
    pub model: String,

    /// Maximum number of cached explain sessions (M).
    #[serde(default = "d_max_sessions")]
    pub max_sessions: usize,

    /// Idle expiry for cached sessions (T), in minutes.
    #[serde(default = "d_session_timeout_mins")]
    pub session_timeout_mins: u64,

    /// Per-request LLM timeout in seconds. Never below 30.
    #[serde(default = "d_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Cap on generated tokens per response. `None` lets the model choose.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_api_key_env(),
            base_url: d_base_url(),
            model: d_model(),
            max_sessions: d_max_sessions(),
            session_timeout_mins: d_session_timeout_mins(),
            request_timeout_secs: d_request_timeout_secs(),
            max_output_tokens: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn d_model() -> String {
    "gemini-2.0-flash".into()
}
fn d_max_sessions() -> usize {
    10
}
fn d_session_timeout_mins() -> u64 {
    30
}
fn d_request_timeout_secs() -> u64 {
    120
}
