mod intel;
mod shield;
mod workspace;

pub use intel::*;
pub use shield::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub shield: ShieldConfig,
    #[serde(default)]
    pub intel: IntelConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.workspace.max_agents == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "workspace.max_agents".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.workspace.max_agents > 16 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "workspace.max_agents".into(),
                message: format!(
                    "{} slots is more than the grid layout is designed for",
                    self.workspace.max_agents
                ),
            });
        }
        if self.workspace.min_dimension == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "workspace.min_dimension".into(),
                message: "must be at least 1 pixel".into(),
            });
        }

        if self.shield.audit_capacity < 2 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "shield.audit_capacity".into(),
                message: "capacity below 2 cannot be halved on overflow".into(),
            });
        }
        for (i, pattern) in self.shield.ad_url_patterns.iter().enumerate() {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("shield.ad_url_patterns[{i}]"),
                    message: format!("invalid regex, pattern ignored: {e}"),
                });
            }
        }
        for (i, host) in self.shield.allowlist.iter().enumerate() {
            if host.trim().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("shield.allowlist[{i}]"),
                    message: "empty allowlist entry ignored".into(),
                });
            }
        }

        if self.intel.max_sessions == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "intel.max_sessions".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.intel.session_timeout_mins == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "intel.session_timeout_mins".into(),
                message: "must be at least 1 minute".into(),
            });
        }
        if self.intel.request_timeout_secs < 30 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "intel.request_timeout_secs".into(),
                message: "LLM timeout must be at least 30 seconds".into(),
            });
        }
        if self.intel.api_key_env.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "intel.api_key_env".into(),
                message: "api_key_env must name an environment variable".into(),
            });
        }

        errors
    }

    /// True when `validate` reported no `Error`-severity issues.
    pub fn is_usable(&self) -> bool {
        !self
            .validate()
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}
