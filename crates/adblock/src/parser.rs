//! EasyList-dialect filter parser.
//!
//! One rule per line. `!` and `[` start comments/headers, blank lines are
//! ignored, and anything unparseable is silently skipped and counted:
//! filter lines are data, not contracts. Exceptions (`@@`, `#@#`) receive
//! half the priority of their blocking counterparts so that allow beats
//! block from the same source.

use regex::Regex;

use crate::rule::{
    ResourceType, Rule, RuleAction, RuleKind, ALLOW_PRIORITY, BLOCK_PRIORITY,
};

/// Result of parsing one list.
#[derive(Debug)]
pub struct ParseOutcome {
    pub rules: Vec<Rule>,
    /// Lines that looked like rules but could not be parsed.
    pub skipped: usize,
}

/// Parse an entire filter list. `source` names the list and seeds the
/// deterministic rule ids (`{source}:{line ordinal}`).
pub fn parse_list(source: &str, text: &str) -> ParseOutcome {
    let mut rules = Vec::new();
    let mut skipped = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
            continue;
        }
        let ordinal = idx + 1;
        match parse_line(source, ordinal, line) {
            Some(rule) => rules.push(rule),
            None => {
                skipped += 1;
                tracing::debug!(source, line = ordinal, "skipping unparseable filter line");
            }
        }
    }

    ParseOutcome { rules, skipped }
}

fn parse_line(source: &str, ordinal: usize, line: &str) -> Option<Rule> {
    let rule_id = format!("{source}:{ordinal}");

    // Cosmetic separators take precedence over anything else on the line.
    if let Some(pos) = line.find("#@#") {
        return parse_cosmetic(source, rule_id, &line[..pos], &line[pos + 3..], RuleAction::Allow);
    }
    if let Some(pos) = line.find("##") {
        return parse_cosmetic(source, rule_id, &line[..pos], &line[pos + 2..], RuleAction::Block);
    }

    parse_network(source, rule_id, line)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cosmetic rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_cosmetic(
    source: &str,
    rule_id: String,
    domains: &str,
    selector: &str,
    action: RuleAction,
) -> Option<Rule> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }

    let host_patterns: Vec<String> = domains
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.starts_with('~'))
        .map(str::to_owned)
        .collect();

    let priority = match action {
        RuleAction::Block => BLOCK_PRIORITY,
        RuleAction::Allow => ALLOW_PRIORITY,
    };

    Some(Rule {
        rule_id,
        kind: RuleKind::Cosmetic,
        host_patterns,
        pattern: String::new(),
        path_regex: None,
        resource_types: Vec::new(),
        third_party: None,
        action,
        priority,
        source: source.to_owned(),
        enabled: true,
        selector: Some(selector.to_owned()),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Network rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Options {
    resource_types: Vec<ResourceType>,
    third_party: Option<bool>,
    domains: Vec<String>,
}

fn parse_network(source: &str, rule_id: String, line: &str) -> Option<Rule> {
    let (line, action) = match line.strip_prefix("@@") {
        Some(rest) => (rest, RuleAction::Allow),
        None => (line, RuleAction::Block),
    };

    let (pattern, options) = match line.rsplit_once('$') {
        Some((pat, opts)) if !pat.is_empty() => (pat, parse_options(opts)?),
        Some(_) => return None,
        None => (line, Options::default()),
    };
    if pattern.is_empty() {
        return None;
    }

    // Domain anchor: `||host` constrains the request host to `host` or
    // any of its subdomains. The rest of the pattern becomes the path
    // predicate.
    let (host_patterns, body) = match pattern.strip_prefix("||") {
        Some(rest) => {
            let host_end = rest
                .find(|c| c == '/' || c == '^' || c == '*')
                .unwrap_or(rest.len());
            let host = &rest[..host_end];
            if host.is_empty() {
                return None;
            }
            (
                vec![host.to_owned(), format!("*.{host}")],
                &rest[host_end..],
            )
        }
        None => (options.domains.clone(), pattern),
    };

    // A pattern that reduces to nothing but the anchor needs no regex;
    // the host predicate suffices.
    let trimmed = body.trim_matches('*');
    let path_regex = if trimmed.is_empty() || trimmed == "^" {
        None
    } else {
        Some(compile_pattern(trimmed)?)
    };

    let priority = match action {
        RuleAction::Block => BLOCK_PRIORITY,
        RuleAction::Allow => ALLOW_PRIORITY,
    };

    Some(Rule {
        rule_id,
        kind: RuleKind::Network,
        host_patterns,
        pattern: pattern.to_owned(),
        path_regex,
        resource_types: options.resource_types,
        third_party: options.third_party,
        action,
        priority,
        source: source.to_owned(),
        enabled: true,
        selector: None,
    })
}

fn parse_options(opts: &str) -> Option<Options> {
    let mut out = Options::default();

    for opt in opts.split(',') {
        let opt = opt.trim();
        if opt.is_empty() {
            return None;
        }
        if let Some(ty) = ResourceType::from_keyword(opt) {
            out.resource_types.push(ty);
            continue;
        }
        match opt {
            "third-party" => out.third_party = Some(true),
            "~third-party" | "first-party" => out.third_party = Some(false),
            _ => {
                if let Some(domains) = opt.strip_prefix("domain=") {
                    // Negated entries are a documented simplification:
                    // they are dropped rather than excluded.
                    out.domains.extend(
                        domains
                            .split('|')
                            .map(str::trim)
                            .filter(|d| !d.is_empty() && !d.starts_with('~'))
                            .map(str::to_owned),
                    );
                } else {
                    // Unknown option: the whole line is unparseable.
                    return None;
                }
            }
        }
    }

    Some(out)
}

/// Compile the path part of a filter pattern. `*` is a wildcard, `^`
/// matches a separator or end-of-input; everything else is literal.
fn compile_pattern(body: &str) -> Option<Regex> {
    let mut re = String::with_capacity(body.len() * 2);
    for c in body.chars() {
        match c {
            '*' => re.push_str(".*"),
            '^' => re.push_str("([/?#]|$)"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    Regex::new(&re).ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Canonical export
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Render rules back to filter-list text. Re-parsing the output yields
/// the same rule set modulo the parser's documented simplifications.
pub fn export_canonical(rules: &[Rule]) -> String {
    let mut out = String::new();

    for rule in rules {
        match rule.kind {
            RuleKind::Cosmetic => {
                out.push_str(&rule.host_patterns.join(","));
                out.push_str(match rule.action {
                    RuleAction::Allow => "#@#",
                    RuleAction::Block => "##",
                });
                out.push_str(rule.selector.as_deref().unwrap_or_default());
            }
            RuleKind::Network => {
                if rule.action == RuleAction::Allow {
                    out.push_str("@@");
                }
                out.push_str(&rule.pattern);

                let mut opts: Vec<String> = rule
                    .resource_types
                    .iter()
                    .map(|t| t.as_str().to_owned())
                    .collect();
                match rule.third_party {
                    Some(true) => opts.push("third-party".into()),
                    Some(false) => opts.push("~third-party".into()),
                    None => {}
                }
                if !rule.pattern.starts_with("||") && !rule.host_patterns.is_empty() {
                    opts.push(format!("domain={}", rule.host_patterns.join("|")));
                }
                if !opts.is_empty() {
                    out.push('$');
                    out.push_str(&opts.join(","));
                }
            }
        }
        out.push('\n');
    }

    out
}
