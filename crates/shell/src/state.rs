//! Shared application state.
//!
//! Everything lives behind an `Arc`; the UI thread and the browser
//! engine's network thread clone what they need. Video intelligence is
//! `None` when the Gemini key is absent; the rest of the workspace
//! keeps working.

use std::sync::Arc;

use sg_adblock::RuleEngine;
use sg_domain::config::Config;
use sg_domain::EventBus;
use sg_intel::VideoIntelligence;
use sg_shield::{Interceptor, ManifestRewriter, ResponseInspector};
use sg_transcripts::TranscriptStore;
use sg_workspace::{AgentRegistry, BrowserHost, Scheduler};

use crate::pipeline::NetworkPipeline;

/// Fully wired SurfGrid core.
///
/// Fields are grouped by concern:
/// - **Interception**: rule engine, interceptor, pipeline
/// - **Transcripts & intelligence**: store, LLM facade
/// - **Workspace**: registry, scheduler, event bus
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    // ── Interception ──────────────────────────────────────────────
    pub engine: Arc<RuleEngine>,
    pub interceptor: Arc<Interceptor>,
    pub pipeline: Arc<NetworkPipeline>,

    // ── Transcripts & intelligence ────────────────────────────────
    pub transcripts: Arc<TranscriptStore>,
    /// `None` when the LLM credential is missing (`CONFIG_MISSING`).
    pub intel: Option<Arc<VideoIntelligence>>,

    // ── Workspace ─────────────────────────────────────────────────
    pub registry: Arc<AgentRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the core around an already-built rule engine and the
    /// embedding compositor's browser host.
    pub fn new(
        config: Arc<Config>,
        engine: Arc<RuleEngine>,
        browser: Arc<dyn BrowserHost>,
        intel: Option<Arc<VideoIntelligence>>,
        transcripts: Arc<TranscriptStore>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(AgentRegistry::new());

        let interceptor = Arc::new(Interceptor::new(engine.clone(), &config.shield));
        let inspector = Arc::new(ResponseInspector::new(config.shield.generic_stripping));
        let rewriter = Arc::new(ManifestRewriter::new(&config.shield.ad_url_patterns));

        let pipeline = Arc::new(NetworkPipeline::new(
            interceptor.clone(),
            inspector,
            rewriter,
            transcripts.clone(),
            bus.clone(),
            config.shield.caption_endpoints.clone(),
        ));

        let scheduler = Arc::new(Scheduler::new(
            registry.clone(),
            browser,
            bus.clone(),
            transcripts.clone(),
            config.workspace.clone(),
        ));

        Self {
            config,
            engine,
            interceptor,
            pipeline,
            transcripts,
            intel,
            registry,
            scheduler,
            bus,
        }
    }
}
