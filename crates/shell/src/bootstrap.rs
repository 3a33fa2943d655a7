//! Core construction shared by the CLI and the embedding compositor.
//!
//! Validates config, loads filter lists (compiled-in default plus any
//! configured extras), builds the rule engine, and wires the full
//! [`AppState`]. Video intelligence is optional: a missing key logs a
//! warning and disables that subsystem only.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use sg_adblock::{parse_list, RuleEngine};
use sg_domain::config::{Config, ConfigSeverity};
use sg_domain::trace::TraceEvent;
use sg_domain::Error;
use sg_intel::{GeminiClient, VideoIntelligence};
use sg_transcripts::TranscriptStore;
use sg_workspace::BrowserHost;

use crate::state::AppState;

/// Initialize the tracing subscriber. `RUST_LOG` controls the filter;
/// the default keeps SurfGrid crates at `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sg_adblock=info,sg_shield=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Load the config file, or defaults when `path` is `None` and no file
/// exists at the conventional location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let candidate = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Path::new("surfgrid.toml").to_path_buf());

    if !candidate.exists() {
        if path.is_some() {
            anyhow::bail!("config file {} does not exist", candidate.display());
        }
        tracing::info!("no surfgrid.toml found, using defaults");
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(&candidate)
        .with_context(|| format!("reading {}", candidate.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("parsing {}", candidate.display()))?;
    tracing::info!(path = %candidate.display(), "config loaded");
    Ok(config)
}

/// Report validation issues through tracing; error out when any issue
/// is `Error`-severity.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Build the rule engine from the compiled-in default list plus every
/// configured extra list. Unreadable files are skipped with a warning.
pub fn build_engine(config: &Config) -> Arc<RuleEngine> {
    let mut rules = Vec::new();

    let outcome = parse_list("default", sg_adblock::default_list());
    TraceEvent::RulesLoaded {
        source: "default".into(),
        rules: outcome.rules.len(),
        skipped: outcome.skipped,
    }
    .emit();
    rules.extend(outcome.rules);

    for path in &config.shield.filter_lists {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let source = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("extra")
                    .to_owned();
                let outcome = parse_list(&source, &text);
                TraceEvent::RulesLoaded {
                    source,
                    rules: outcome.rules.len(),
                    skipped: outcome.skipped,
                }
                .emit();
                rules.extend(outcome.rules);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "filter list unreadable, skipped");
            }
        }
    }

    Arc::new(RuleEngine::with_rules(rules))
}

/// Validate config, build every subsystem, and return the wired core.
pub fn build_app_state(
    config: Arc<Config>,
    browser: Arc<dyn BrowserHost>,
) -> anyhow::Result<AppState> {
    validate_config(&config)?;

    let engine = build_engine(&config);
    tracing::info!(rules = engine.rule_count(), "rule engine ready");

    let transcripts = Arc::new(TranscriptStore::new());

    // ── Video intelligence (optional) ─────────────────────────────
    let intel = match GeminiClient::from_config(&config.intel) {
        Ok(client) => {
            tracing::info!(model = %config.intel.model, "video intelligence ready");
            Some(Arc::new(VideoIntelligence::new(
                transcripts.clone(),
                Arc::new(client),
                &config.intel,
            )))
        }
        Err(Error::ConfigMissing(var)) => {
            tracing::warn!(var, "LLM credential missing, video intelligence disabled");
            None
        }
        Err(e) => return Err(e).context("initializing Gemini client"),
    };

    Ok(AppState::new(
        config,
        engine,
        browser,
        intel,
        transcripts,
    ))
}
