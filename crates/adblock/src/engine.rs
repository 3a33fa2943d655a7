//! Trie-indexed rule engine.
//!
//! Network rules are indexed by host in a reverse-label trie; candidates
//! are evaluated in priority order (lower wins, insertion order breaks
//! ties). The compiled rule set is immutable and swapped atomically on
//! reload, so the interceptor thread always sees a consistent snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::rule::{ResourceType, Rule, RuleAction, RuleKind};
use crate::trie::HostTrie;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / result types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The slice of a request the engine needs for matching.
#[derive(Debug, Clone, Copy)]
pub struct NetRequest<'a> {
    pub host: &'a str,
    /// URL path plus `'?'` plus query, the way path predicates expect it.
    pub path_and_query: &'a str,
    pub resource_type: ResourceType,
    pub is_third_party: bool,
}

/// Outcome of consulting the engine for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub rule_id: Option<String>,
    pub action: RuleAction,
}

impl MatchResult {
    fn no_match() -> Self {
        Self {
            matched: false,
            rule_id: None,
            action: RuleAction::Allow,
        }
    }
}

/// Counters kept while matching. Inspectable and resettable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStats {
    pub checked: u64,
    pub blocked: u64,
    pub allowed: u64,
    /// Running average time per match, in microseconds.
    pub avg_match_us: f64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Compiled rule set
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct CompiledRuleset {
    rules: Vec<Rule>,
    trie: HostTrie,
    /// Cosmetic rule indices with at least one host pattern.
    cosmetic_by_host: HashMap<String, Vec<u32>>,
    /// Cosmetic rule indices with no host constraint.
    generic_cosmetic: Vec<u32>,
}

impl CompiledRuleset {
    fn empty() -> Self {
        Self::compile(Vec::new())
    }

    fn compile(rules: Vec<Rule>) -> Self {
        let mut trie = HostTrie::new();
        let mut cosmetic_by_host: HashMap<String, Vec<u32>> = HashMap::new();
        let mut generic_cosmetic = Vec::new();

        for (idx, rule) in rules.iter().enumerate() {
            let idx = idx as u32;
            if !rule.enabled {
                continue;
            }
            match rule.kind {
                RuleKind::Network => {
                    if rule.host_patterns.is_empty() {
                        trie.insert("", idx);
                    } else {
                        for hp in &rule.host_patterns {
                            trie.insert(hp, idx);
                        }
                    }
                }
                RuleKind::Cosmetic => {
                    if rule.host_patterns.is_empty() {
                        generic_cosmetic.push(idx);
                    } else {
                        for hp in &rule.host_patterns {
                            cosmetic_by_host
                                .entry(hp.to_ascii_lowercase())
                                .or_default()
                                .push(idx);
                        }
                    }
                }
            }
        }

        Self {
            rules,
            trie,
            cosmetic_by_host,
            generic_cosmetic,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared between the config-mutating world and the interceptor-calling
/// world: reads take a cheap `Arc` snapshot, reloads swap the pointer.
pub struct RuleEngine {
    ruleset: RwLock<Arc<CompiledRuleset>>,
    checked: AtomicU64,
    blocked: AtomicU64,
    allowed: AtomicU64,
    match_nanos: AtomicU64,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// An engine with no rules; matches nothing.
    pub fn new() -> Self {
        Self {
            ruleset: RwLock::new(Arc::new(CompiledRuleset::empty())),
            checked: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            match_nanos: AtomicU64::new(0),
        }
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        let engine = Self::new();
        engine.install(rules);
        engine
    }

    /// Replace the whole rule set atomically. Readers either see the old
    /// set or the new one, never a mix.
    pub fn install(&self, rules: Vec<Rule>) {
        let compiled = Arc::new(CompiledRuleset::compile(rules));
        tracing::info!(rules = compiled.rules.len(), "rule set installed");
        *self.ruleset.write() = compiled;
    }

    pub fn rule_count(&self) -> usize {
        self.ruleset.read().rules.len()
    }

    /// Match one request. Candidates are evaluated in priority order and
    /// the first rule whose predicates all hold wins.
    pub fn match_request(&self, req: &NetRequest<'_>) -> MatchResult {
        let started = Instant::now();
        let snapshot = self.ruleset.read().clone();

        let mut candidates: Vec<u32> = Vec::new();
        snapshot.trie.candidates(req.host, &mut candidates);
        candidates.sort_by_key(|&i| (snapshot.rules[i as usize].priority, i));

        let mut result = MatchResult::no_match();
        for idx in candidates {
            let rule = &snapshot.rules[idx as usize];
            if rule.kind != RuleKind::Network || !rule.enabled {
                continue;
            }
            if !rule.type_matches(req.resource_type) {
                continue;
            }
            if !rule.party_matches(req.is_third_party) {
                continue;
            }
            if let Some(re) = &rule.path_regex {
                if !re.is_match(req.path_and_query) {
                    continue;
                }
            }
            result = MatchResult {
                matched: true,
                rule_id: Some(rule.rule_id.clone()),
                action: rule.action,
            };
            break;
        }

        self.checked.fetch_add(1, Ordering::Relaxed);
        match (result.matched, result.action) {
            (true, RuleAction::Block) => self.blocked.fetch_add(1, Ordering::Relaxed),
            _ => self.allowed.fetch_add(1, Ordering::Relaxed),
        };
        self.match_nanos
            .fetch_add(started.elapsed().as_nanos() as u64, Ordering::Relaxed);

        result
    }

    /// Element-hiding selectors applicable to a host: generic selectors
    /// plus host-scoped ones, minus those cancelled by a cosmetic
    /// exception for the same host.
    pub fn cosmetic_selectors(&self, host: &str) -> Vec<String> {
        let snapshot = self.ruleset.read().clone();
        let host = host.to_ascii_lowercase();

        let mut scoped: Vec<u32> = Vec::new();
        for (pattern, indices) in &snapshot.cosmetic_by_host {
            if host == *pattern || host.ends_with(&format!(".{pattern}")) {
                scoped.extend_from_slice(indices);
            }
        }

        let exceptions: HashSet<&str> = scoped
            .iter()
            .chain(snapshot.generic_cosmetic.iter())
            .map(|&i| &snapshot.rules[i as usize])
            .filter(|r| r.action == RuleAction::Allow)
            .filter_map(|r| r.selector.as_deref())
            .collect();

        let mut out: Vec<String> = Vec::new();
        for &i in snapshot.generic_cosmetic.iter().chain(scoped.iter()) {
            let rule = &snapshot.rules[i as usize];
            if rule.action != RuleAction::Block {
                continue;
            }
            if let Some(sel) = &rule.selector {
                if !exceptions.contains(sel.as_str()) && !out.contains(sel) {
                    out.push(sel.clone());
                }
            }
        }
        out
    }

    // ── Statistics ─────────────────────────────────────────────────

    pub fn stats(&self) -> EngineStats {
        let checked = self.checked.load(Ordering::Relaxed);
        let nanos = self.match_nanos.load(Ordering::Relaxed);
        EngineStats {
            checked,
            blocked: self.blocked.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            avg_match_us: if checked == 0 {
                0.0
            } else {
                nanos as f64 / checked as f64 / 1000.0
            },
        }
    }

    pub fn reset_stats(&self) {
        self.checked.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.match_nanos.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_list;

    fn engine_from(text: &str) -> RuleEngine {
        RuleEngine::with_rules(parse_list("test", text).rules)
    }

    fn request<'a>(host: &'a str, path: &'a str, ty: ResourceType) -> NetRequest<'a> {
        NetRequest {
            host,
            path_and_query: path,
            resource_type: ty,
            is_third_party: true,
        }
    }

    #[test]
    fn empty_engine_never_blocks() {
        let engine = RuleEngine::new();
        let result = engine.match_request(&request("ads.example.com", "/a.js", ResourceType::Script));
        assert!(!result.matched);
        assert_eq!(result.action, RuleAction::Allow);
    }

    #[test]
    fn domain_anchor_blocks_host_and_subdomains() {
        let engine = engine_from("||example.com^\n");
        assert!(engine
            .match_request(&request("example.com", "/", ResourceType::Document))
            .matched);
        assert!(engine
            .match_request(&request("ads.example.com", "/x.js", ResourceType::Script))
            .matched);
        assert!(!engine
            .match_request(&request("example.org", "/", ResourceType::Document))
            .matched);
    }

    #[test]
    fn exception_outranks_block_for_its_type() {
        let engine = engine_from("||ads.example.com^\n@@||ads.example.com^$script\n");

        let script = engine.match_request(&request("ads.example.com", "/a.js", ResourceType::Script));
        assert!(script.matched);
        assert_eq!(script.action, RuleAction::Allow);
        assert_eq!(script.rule_id.as_deref(), Some("test:2"));

        let image = engine.match_request(&request("ads.example.com", "/a.jpg", ResourceType::Image));
        assert!(image.matched);
        assert_eq!(image.action, RuleAction::Block);
        assert_eq!(image.rule_id.as_deref(), Some("test:1"));
    }

    #[test]
    fn lower_priority_wins_with_insertion_tiebreak() {
        // Two block rules match; the first inserted wins the tie.
        let engine = engine_from("||x.com^\n||x.com^$script\n");
        let result = engine.match_request(&request("x.com", "/a.js", ResourceType::Script));
        assert_eq!(result.rule_id.as_deref(), Some("test:1"));
    }

    #[test]
    fn party_predicate_is_honored() {
        let engine = engine_from("||cdn.example.com^$third-party\n");
        let mut req = request("cdn.example.com", "/lib.js", ResourceType::Script);
        assert!(engine.match_request(&req).matched);
        req.is_third_party = false;
        assert!(!engine.match_request(&req).matched);
    }

    #[test]
    fn path_predicate_sees_query_string() {
        let engine = engine_from("&ad_type=\n");
        assert!(engine
            .match_request(&request("any.example.com", "/watch?x=1&ad_type=banner", ResourceType::Xhr))
            .matched);
        assert!(!engine
            .match_request(&request("any.example.com", "/watch?x=1", ResourceType::Xhr))
            .matched);
    }

    #[test]
    fn empty_host_matches_only_hostless_rules() {
        let engine = engine_from("||example.com^\n/ads/banner/*\n");
        let result = engine.match_request(&request("", "/ads/banner/1.png", ResourceType::Image));
        assert!(result.matched);
        assert_eq!(result.rule_id.as_deref(), Some("test:2"));
        assert!(!engine
            .match_request(&request("", "/other.png", ResourceType::Image))
            .matched);
    }

    #[test]
    fn cosmetic_rules_never_match_network_requests() {
        let engine = engine_from("##.ad-banner\n");
        let result = engine.match_request(&request("example.com", "/", ResourceType::Document));
        assert!(!result.matched);
    }

    #[test]
    fn cosmetic_selectors_respect_exceptions() {
        let engine = engine_from(
            "##.ad-banner\n##.sponsored\nexample.com#@#.sponsored\nexample.com##.promo\n",
        );
        let on_example = engine.cosmetic_selectors("www.example.com");
        assert!(on_example.contains(&".ad-banner".to_string()));
        assert!(on_example.contains(&".promo".to_string()));
        assert!(!on_example.contains(&".sponsored".to_string()));

        let elsewhere = engine.cosmetic_selectors("other.net");
        assert!(elsewhere.contains(&".sponsored".to_string()));
        assert!(!elsewhere.contains(&".promo".to_string()));
    }

    #[test]
    fn atomic_reload_replaces_the_set() {
        let engine = engine_from("||a.com^\n");
        assert!(engine
            .match_request(&request("a.com", "/", ResourceType::Document))
            .matched);

        engine.install(parse_list("test", "||b.com^\n").rules);
        assert!(!engine
            .match_request(&request("a.com", "/", ResourceType::Document))
            .matched);
        assert!(engine
            .match_request(&request("b.com", "/", ResourceType::Document))
            .matched);
    }

    #[test]
    fn stats_count_and_reset() {
        let engine = engine_from("||blocked.com^\n");
        engine.match_request(&request("blocked.com", "/", ResourceType::Document));
        engine.match_request(&request("fine.com", "/", ResourceType::Document));

        let stats = engine.stats();
        assert_eq!(stats.checked, 2);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.allowed, 1);

        engine.reset_stats();
        assert_eq!(engine.stats().checked, 0);
    }
}
