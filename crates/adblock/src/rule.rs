//! Canonical rule records produced by the filter parser.

use regex::Regex;
use std::fmt;

/// Which layer a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Matched against outgoing requests.
    Network,
    /// An element-hiding selector; indexed but never matched on the
    /// network path.
    Cosmetic,
}

/// What a matching rule does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Block,
    Allow,
}

/// Normalized request resource classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Script,
    Image,
    Stylesheet,
    Xhr,
    Fetch,
    Websocket,
    Media,
    Document,
    Subdocument,
    Font,
    Ping,
    Other,
}

impl ResourceType {
    /// Parse a `$`-option keyword. Returns `None` for anything that is
    /// not a resource-type keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let ty = match keyword {
            "script" => Self::Script,
            "image" => Self::Image,
            "stylesheet" => Self::Stylesheet,
            "xhr" | "xmlhttprequest" => Self::Xhr,
            "fetch" => Self::Fetch,
            "websocket" => Self::Websocket,
            "media" => Self::Media,
            "document" => Self::Document,
            "subdocument" => Self::Subdocument,
            "font" => Self::Font,
            "ping" => Self::Ping,
            "other" => Self::Other,
            _ => return None,
        };
        Some(ty)
    }

    /// Normalize whatever the browser engine reports. Unknown types
    /// collapse to `Other`.
    pub fn from_wire(raw: &str) -> Self {
        Self::from_keyword(&raw.to_ascii_lowercase()).unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Image => "image",
            Self::Stylesheet => "stylesheet",
            Self::Xhr => "xhr",
            Self::Fetch => "fetch",
            Self::Websocket => "websocket",
            Self::Media => "media",
            Self::Document => "document",
            Self::Subdocument => "subdocument",
            Self::Font => "font",
            Self::Ping => "ping",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default priority for block rules. Lower wins; exceptions get half so
/// that allow beats block at the same source.
pub const BLOCK_PRIORITY: i32 = 100;
pub const ALLOW_PRIORITY: i32 = BLOCK_PRIORITY / 2;

/// One parsed filter-list entry. Immutable after parsing; rule sets are
/// replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Deterministic id derived from `{source}:{1-based line ordinal}`,
    /// stable across reloads of the same list.
    pub rule_id: String,
    pub kind: RuleKind,
    /// Host constraints. A `*.`-prefixed entry matches strictly deeper
    /// subdomains; a bare host matches exactly. Empty = any host.
    pub host_patterns: Vec<String>,
    /// The raw network pattern as written (without `@@` or options),
    /// kept for canonical export.
    pub pattern: String,
    /// Pre-compiled pattern predicate, tested against `path + '?' + query`.
    /// Absent when the pattern reduces to a bare domain anchor.
    pub path_regex: Option<Regex>,
    /// Constrained resource types. Empty = any.
    pub resource_types: Vec<ResourceType>,
    /// `Some(true)` = third-party only, `Some(false)` = first-party only,
    /// `None` = unconstrained.
    pub third_party: Option<bool>,
    pub action: RuleAction,
    pub priority: i32,
    /// Which list this rule came from.
    pub source: String,
    pub enabled: bool,
    /// Element-hiding selector; cosmetic rules only.
    pub selector: Option<String>,
}

impl Rule {
    /// True when the request's party matches this rule's constraint.
    pub fn party_matches(&self, is_third_party: bool) -> bool {
        match self.third_party {
            Some(want) => want == is_third_party,
            None => true,
        }
    }

    /// True when the request's resource type matches this rule's
    /// constraint.
    pub fn type_matches(&self, ty: ResourceType) -> bool {
        self.resource_types.is_empty() || self.resource_types.contains(&ty)
    }
}
