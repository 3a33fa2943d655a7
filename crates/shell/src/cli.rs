//! Diagnostic CLI.
//!
//! The compositor embeds the shell as a library; the `surfgrid` binary
//! exists for operators: validate a config, dry-run a URL against the
//! loaded rule set, and inspect what the lists compiled to.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sg_shield::InterceptRequest;

/// SurfGrid, a multi-agent browsing workspace core.
#[derive(Debug, Parser)]
#[command(name = "surfgrid", version, about)]
pub struct Cli {
    /// Path to surfgrid.toml (defaults to ./surfgrid.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the configuration and report every issue.
    CheckConfig,
    /// Dry-run one URL against the loaded filter lists and print the
    /// decision.
    Match {
        /// Request URL to classify.
        #[arg(long)]
        url: String,
        /// Resource type as the engine would report it.
        #[arg(long = "type", default_value = "other")]
        resource_type: String,
        /// Page URL, for the third-party computation.
        #[arg(long)]
        page: Option<String>,
    },
    /// Summarize the compiled rule set.
    Rules {
        /// Print the canonical form of every rule instead.
        #[arg(long)]
        export: bool,
    },
}

/// Run `check-config`. Returns false when validation failed.
pub fn check_config(config: &sg_domain::config::Config) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("config OK");
        return true;
    }
    for issue in &issues {
        println!("{issue}");
    }
    !issues
        .iter()
        .any(|i| i.severity == sg_domain::config::ConfigSeverity::Error)
}

/// Run `match`: classify one URL the way the interceptor would.
pub fn match_url(
    config: &sg_domain::config::Config,
    url: &str,
    resource_type: &str,
    page: Option<&str>,
) -> anyhow::Result<()> {
    let engine = crate::bootstrap::build_engine(config);
    let interceptor = sg_shield::Interceptor::new(engine, &config.shield);

    let request = InterceptRequest::derive(url, resource_type, page, "GET")?;
    let decision = interceptor.decide("cli", &request, &[]);

    println!(
        "{}",
        serde_json::json!({
            "url": url,
            "host": request.host,
            "resource_type": request.resource_type.as_str(),
            "third_party": request.is_third_party,
            "block": decision.block,
            "rule_id": decision.rule_id,
            "reason": format!("{:?}", decision.reason),
        })
    );
    Ok(())
}

/// Run `rules`: either a summary or the canonical export.
pub fn rules(config: &sg_domain::config::Config, export: bool) -> anyhow::Result<()> {
    let mut all = Vec::new();

    let default = sg_adblock::parse_list("default", sg_adblock::default_list());
    println!(
        "default: {} rules ({} lines skipped)",
        default.rules.len(),
        default.skipped
    );
    all.extend(default.rules);

    for path in &config.shield.filter_lists {
        let text = std::fs::read_to_string(path)?;
        let source = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("extra")
            .to_owned();
        let outcome = sg_adblock::parse_list(&source, &text);
        println!(
            "{source}: {} rules ({} lines skipped)",
            outcome.rules.len(),
            outcome.skipped
        );
        all.extend(outcome.rules);
    }

    if export {
        print!("{}", sg_adblock::export_canonical(&all));
    }
    Ok(())
}
