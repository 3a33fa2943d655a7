use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Network shield
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How aggressively the interceptor treats outgoing requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldMode {
    /// No interception at all; every request is allowed untouched.
    Off,
    /// Rule blocking plus third-party `Referer` stripping.
    Strict,
    /// Rule blocking and tracking-header stripping only.
    #[default]
    Balanced,
    /// Third-party requests must be allowlisted; first-party traffic
    /// still goes through the rules.
    Allowlist,
}

/// Configuration for the interception pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default)]
    pub mode: ShieldMode,

    /// Hosts that are never blocked. A leading `*.` matches any
    /// subdomain; a bare host matches exactly.
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Additional EasyList-dialect filter files loaded at startup, on
    /// top of the compiled-in default list.
    #[serde(default)]
    pub filter_lists: Vec<PathBuf>,

    /// Capacity of the block-audit ring buffer. The oldest half is
    /// dropped in one batch on overflow.
    #[serde(default = "d_audit_capacity")]
    pub audit_capacity: usize,

    /// Apply the permissive generic key set to JSON responses from
    /// unrecognized endpoints.
    #[serde(default = "d_true")]
    pub generic_stripping: bool,

    /// Regexes identifying ad segment URLs inside streaming manifests.
    #[serde(default = "d_ad_url_patterns")]
    pub ad_url_patterns: Vec<String>,

    /// URL substrings that mark a response as captioning traffic.
    #[serde(default = "d_caption_endpoints")]
    pub caption_endpoints: Vec<String>,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            mode: ShieldMode::default(),
            allowlist: Vec::new(),
            filter_lists: Vec::new(),
            audit_capacity: d_audit_capacity(),
            generic_stripping: d_true(),
            ad_url_patterns: d_ad_url_patterns(),
            caption_endpoints: d_caption_endpoints(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_audit_capacity() -> usize {
    1000
}
fn d_true() -> bool {
    true
}
fn d_ad_url_patterns() -> Vec<String> {
    [
        r"doubleclick\.net",
        r"googlesyndication\.com",
        r"/pagead/",
        r"adservice\.",
        r"ad-?segment",
        r"/ads?/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn d_caption_endpoints() -> Vec<String> {
    ["/api/timedtext", "timedtext?"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
