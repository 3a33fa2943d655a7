//! Per-request decision point.
//!
//! Called by the browser engine's network hook before any request goes
//! out. Produces exactly one decision per request; actual cancellation
//! is the engine's job. The mode flag and allowlist are mutated from
//! the UI world while this runs on the network thread, hence the
//! read-heavy locks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use sg_adblock::{NetRequest, RuleAction, RuleEngine};
use sg_domain::config::{ShieldConfig, ShieldMode};
use sg_domain::trace::TraceEvent;

use crate::audit::{AuditBuffer, AuditRow};
use crate::request::InterceptRequest;

/// Header names with these lowercase prefixes are stripped from every
/// intercepted request.
const TRACKING_HEADER_PREFIXES: &[&str] = &[
    "x-client-data",
    "x-adid",
    "x-advertiser",
    "x-fb-",
    "x-tracking",
    "x-uidh",
    "x-amzn-trace",
];

/// Why the interceptor decided the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Shield mode is off; nothing was consulted.
    Off,
    /// The host is on the user allowlist.
    Allowlist,
    /// A rule matched.
    Rule,
    /// Allowlist mode blocked a third-party request with no rule.
    NotAllowlisted,
    /// Nothing matched; the request proceeds.
    Default,
}

/// The interceptor's answer for one request.
#[derive(Debug, Clone)]
pub struct Decision {
    pub block: bool,
    pub rule_id: Option<String>,
    pub reason: DecisionReason,
    /// Header modifications to apply; an empty-string value means
    /// "remove this header".
    pub header_mods: HashMap<String, String>,
}

impl Decision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            block: false,
            rule_id: None,
            reason,
            header_mods: HashMap::new(),
        }
    }
}

/// Front door of the interception pipeline.
pub struct Interceptor {
    engine: Arc<RuleEngine>,
    audit: Arc<AuditBuffer>,
    mode: RwLock<ShieldMode>,
    allowlist: RwLock<Vec<String>>,
}

impl Interceptor {
    pub fn new(engine: Arc<RuleEngine>, config: &ShieldConfig) -> Self {
        Self {
            engine,
            audit: Arc::new(AuditBuffer::new(config.audit_capacity)),
            mode: RwLock::new(config.mode),
            allowlist: RwLock::new(config.allowlist.clone()),
        }
    }

    pub fn mode(&self) -> ShieldMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: ShieldMode) {
        tracing::info!(?mode, "shield mode changed");
        *self.mode.write() = mode;
    }

    pub fn set_allowlist(&self, hosts: Vec<String>) {
        *self.allowlist.write() = hosts;
    }

    pub fn audit(&self) -> &Arc<AuditBuffer> {
        &self.audit
    }

    /// Decide one request. At most one decision is produced per request
    /// and the caller must not deliver the response before this returns.
    pub fn decide(&self, agent_id: &str, req: &InterceptRequest, headers: &[(String, String)]) -> Decision {
        let mode = *self.mode.read();
        if mode == ShieldMode::Off {
            return Decision::allow(DecisionReason::Off);
        }

        if self.host_allowlisted(&req.host) {
            return Decision::allow(DecisionReason::Allowlist);
        }

        let result = self.engine.match_request(&NetRequest {
            host: &req.host,
            path_and_query: &req.path,
            resource_type: req.resource_type,
            is_third_party: req.is_third_party,
        });

        if result.matched && result.action == RuleAction::Block {
            self.record_block(agent_id, req, result.rule_id.clone());
            return Decision {
                block: true,
                rule_id: result.rule_id,
                reason: DecisionReason::Rule,
                header_mods: HashMap::new(),
            };
        }

        // Allowlist mode: third-party traffic must be explicitly
        // allowlisted (or saved by a rule exception above). First-party
        // traffic proceeds.
        let rule_allowed = result.matched && result.action == RuleAction::Allow;
        if mode == ShieldMode::Allowlist && req.is_third_party && !rule_allowed {
            self.record_block(agent_id, req, None);
            return Decision {
                block: true,
                rule_id: None,
                reason: DecisionReason::NotAllowlisted,
                header_mods: HashMap::new(),
            };
        }

        Decision {
            block: false,
            rule_id: result.rule_id,
            reason: if result.matched {
                DecisionReason::Rule
            } else {
                DecisionReason::Default
            },
            header_mods: self.header_mods(mode, req, headers),
        }
    }

    fn host_allowlisted(&self, host: &str) -> bool {
        let allowlist = self.allowlist.read();
        allowlist.iter().any(|entry| {
            let entry = entry.trim();
            match entry.strip_prefix("*.") {
                Some(base) => {
                    !base.is_empty() && host.len() > base.len() && host.ends_with(base)
                        && host.as_bytes()[host.len() - base.len() - 1] == b'.'
                }
                None => !entry.is_empty() && host.eq_ignore_ascii_case(entry),
            }
        })
    }

    fn header_mods(
        &self,
        mode: ShieldMode,
        req: &InterceptRequest,
        headers: &[(String, String)],
    ) -> HashMap<String, String> {
        let mut mods = HashMap::new();
        for (name, _) in headers {
            let lower = name.to_ascii_lowercase();
            if TRACKING_HEADER_PREFIXES.iter().any(|p| lower.starts_with(p)) {
                mods.insert(name.clone(), String::new());
            }
        }
        if mode == ShieldMode::Strict && req.is_third_party {
            mods.insert("Referer".into(), String::new());
        }
        mods
    }

    fn record_block(&self, agent_id: &str, req: &InterceptRequest, rule_id: Option<String>) {
        let request_id = format!("req-{}", uuid::Uuid::new_v4());
        TraceEvent::RequestDecided {
            request_id: request_id.clone(),
            agent_id: agent_id.to_owned(),
            host: req.host.clone(),
            blocked: true,
            rule_id: rule_id.clone(),
        }
        .emit();

        self.audit.push(AuditRow {
            request_id,
            agent_id: agent_id.to_owned(),
            timestamp: Utc::now(),
            url: req.url.clone(),
            host: req.host.clone(),
            resource_type: req.resource_type,
            rule_id,
            action: "block".into(),
            page_url: req.page_url.clone(),
            method: req.method.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_adblock::parse_list;

    fn interceptor(list: &str, mode: ShieldMode, allowlist: Vec<String>) -> Interceptor {
        let engine = Arc::new(RuleEngine::with_rules(parse_list("test", list).rules));
        let config = ShieldConfig {
            mode,
            allowlist,
            ..Default::default()
        };
        Interceptor::new(engine, &config)
    }

    fn req(url: &str, ty: &str, page: Option<&str>) -> InterceptRequest {
        InterceptRequest::derive(url, ty, page, "GET").unwrap()
    }

    #[test]
    fn off_mode_allows_everything() {
        let i = interceptor("||ads.example.com^\n", ShieldMode::Off, vec![]);
        let d = i.decide("a1", &req("https://ads.example.com/a.js", "script", None), &[]);
        assert!(!d.block);
        assert_eq!(d.reason, DecisionReason::Off);
        assert!(i.audit().is_empty());
    }

    #[test]
    fn rule_block_records_audit_row() {
        let i = interceptor("||ads.example.com^\n", ShieldMode::Balanced, vec![]);
        let d = i.decide("a1", &req("https://ads.example.com/a.js", "script", None), &[]);
        assert!(d.block);
        assert_eq!(d.reason, DecisionReason::Rule);
        assert_eq!(d.rule_id.as_deref(), Some("test:1"));

        let rows = i.audit().recent(10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rule_id.as_deref(), Some("test:1"));
        assert_eq!(rows[0].host, "ads.example.com");
    }

    #[test]
    fn allowlist_beats_rules() {
        let i = interceptor(
            "||ads.example.com^\n",
            ShieldMode::Balanced,
            vec!["*.example.com".into()],
        );
        let d = i.decide("a1", &req("https://ads.example.com/a.js", "script", None), &[]);
        assert!(!d.block);
        assert_eq!(d.reason, DecisionReason::Allowlist);
        assert!(i.audit().is_empty());
    }

    #[test]
    fn allowlist_glob_is_subdomain_only() {
        let i = interceptor("", ShieldMode::Balanced, vec!["*.example.com".into()]);
        assert!(i.host_allowlisted("ads.example.com"));
        assert!(i.host_allowlisted("a.b.example.com"));
        assert!(!i.host_allowlisted("example.com"));
        assert!(!i.host_allowlisted("badexample.com"));
    }

    #[test]
    fn allowlist_mode_blocks_unlisted_third_parties() {
        let i = interceptor("", ShieldMode::Allowlist, vec!["*.trusted.net".into()]);
        let page = Some("https://www.example.com/");

        let d = i.decide("a1", &req("https://cdn.tracker.io/px.gif", "image", page), &[]);
        assert!(d.block);
        assert_eq!(d.reason, DecisionReason::NotAllowlisted);
        assert!(d.rule_id.is_none());
        assert_eq!(i.audit().recent(10)[0].rule_id, None);

        let d = i.decide("a1", &req("https://cdn.trusted.net/lib.js", "script", page), &[]);
        assert!(!d.block);

        let d = i.decide("a1", &req("https://www.example.com/app.js", "script", page), &[]);
        assert!(!d.block);
    }

    #[test]
    fn allowlist_mode_respects_rule_exceptions() {
        let i = interceptor("@@||cdn.partner.io^\n", ShieldMode::Allowlist, vec![]);
        let page = Some("https://www.example.com/");
        let d = i.decide("a1", &req("https://cdn.partner.io/sdk.js", "script", page), &[]);
        assert!(!d.block);
    }

    #[test]
    fn tracking_headers_are_stripped() {
        let i = interceptor("", ShieldMode::Balanced, vec![]);
        let headers = vec![
            ("X-Client-Data".to_string(), "abc".to_string()),
            ("Accept".to_string(), "*/*".to_string()),
        ];
        let d = i.decide("a1", &req("https://example.com/x", "xhr", None), &headers);
        assert_eq!(d.header_mods.get("X-Client-Data").map(String::as_str), Some(""));
        assert!(!d.header_mods.contains_key("Accept"));
    }

    #[test]
    fn strict_mode_strips_referer_for_third_parties() {
        let i = interceptor("", ShieldMode::Strict, vec![]);
        let page = Some("https://www.example.com/");

        let d = i.decide("a1", &req("https://cdn.other.net/f.woff2", "font", page), &[]);
        assert_eq!(d.header_mods.get("Referer").map(String::as_str), Some(""));

        let d = i.decide("a1", &req("https://www.example.com/f.woff2", "font", page), &[]);
        assert!(!d.header_mods.contains_key("Referer"));
    }
}
