//! The glue the browser engine's hooks call.
//!
//! `on_request` runs before any request leaves; `on_response` dispatches
//! response bodies by content type to the caption extractor, the JSON
//! inspector, or the manifest rewriter. A request is never dropped and a
//! body never lost because of a core-internal failure; the original
//! content is always the fallback.

use std::sync::Arc;

use sg_domain::trace::TraceEvent;
use sg_domain::{EventBus, VideoKey, WorkspaceEvent};
use sg_shield::captions;
use sg_shield::{Decision, DecisionReason, InterceptRequest, Interceptor, ManifestRewriter, ResponseInspector};
use sg_transcripts::TranscriptStore;

/// Metadata accompanying one response body.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext<'a> {
    pub url: &'a str,
    pub content_type: &'a str,
    /// Video the captions belong to, when the engine already knows it.
    /// Falls back to the `v` query parameter of `url`.
    pub video_id: Option<&'a str>,
    pub language: Option<&'a str>,
}

/// Request/response fan-out for one workspace.
pub struct NetworkPipeline {
    interceptor: Arc<Interceptor>,
    inspector: Arc<ResponseInspector>,
    rewriter: Arc<ManifestRewriter>,
    transcripts: Arc<TranscriptStore>,
    bus: Arc<EventBus>,
    caption_endpoints: Vec<String>,
}

impl NetworkPipeline {
    pub fn new(
        interceptor: Arc<Interceptor>,
        inspector: Arc<ResponseInspector>,
        rewriter: Arc<ManifestRewriter>,
        transcripts: Arc<TranscriptStore>,
        bus: Arc<EventBus>,
        caption_endpoints: Vec<String>,
    ) -> Self {
        Self {
            interceptor,
            inspector,
            rewriter,
            transcripts,
            bus,
            caption_endpoints,
        }
    }

    pub fn inspector(&self) -> &Arc<ResponseInspector> {
        &self.inspector
    }

    /// Decide one outgoing request. Must return before the engine may
    /// deliver this request's response.
    pub fn on_request(
        &self,
        agent_id: &str,
        url: &str,
        resource_type: &str,
        page_url: Option<&str>,
        method: &str,
        headers: &[(String, String)],
    ) -> Decision {
        let request = match InterceptRequest::derive(url, resource_type, page_url, method) {
            Ok(req) => req,
            Err(e) => {
                // A URL we cannot parse is not a reason to break the
                // page; let the engine handle it untouched.
                tracing::warn!(url, error = %e, "request not classifiable");
                return Decision {
                    block: false,
                    rule_id: None,
                    reason: DecisionReason::Default,
                    header_mods: Default::default(),
                };
            }
        };

        let decision = self.interceptor.decide(agent_id, &request, headers);
        if decision.block {
            self.bus.publish(WorkspaceEvent::RequestBlocked {
                agent_id: agent_id.to_owned(),
                url: url.to_owned(),
                rule_id: decision.rule_id.clone(),
            });
        }
        decision
    }

    /// Transform one response body. Captioning traffic additionally
    /// lands in the transcript store.
    pub fn on_response(&self, agent_id: &str, ctx: &ResponseContext<'_>, body: &str) -> String {
        if self.is_caption_endpoint(ctx.url) {
            self.capture_transcript(agent_id, ctx, body);
            return body.to_owned();
        }

        if ctx.content_type.to_ascii_lowercase().contains("json") {
            let path = path_of(ctx.url);
            return self.inspector.inspect(&path, ctx.content_type, body).content;
        }

        self.rewriter.rewrite(ctx.content_type, body).content
    }

    fn is_caption_endpoint(&self, url: &str) -> bool {
        self.caption_endpoints.iter().any(|e| url.contains(e))
    }

    fn capture_transcript(&self, agent_id: &str, ctx: &ResponseContext<'_>, body: &str) {
        let Some(video_id) = ctx
            .video_id
            .map(str::to_owned)
            .or_else(|| video_id_from_url(ctx.url))
        else {
            tracing::debug!(url = ctx.url, "caption response without a video id");
            return;
        };

        let segments = if ctx.content_type.to_ascii_lowercase().contains("vtt") {
            captions::parse_webvtt(body)
        } else {
            captions::parse_json3(body)
        };
        if segments.is_empty() {
            return;
        }

        let key = VideoKey::new(agent_id, video_id.clone());
        let count = segments.len();
        self.transcripts
            .put(key, ctx.language.map(str::to_owned), segments);

        TraceEvent::TranscriptCaptured {
            agent_id: agent_id.to_owned(),
            video_id: video_id.clone(),
            segments: count,
        }
        .emit();
        self.bus.publish(WorkspaceEvent::TranscriptAvailable {
            agent_id: agent_id.to_owned(),
            video_id,
            segments: count,
        });
    }
}

/// Path component of a URL, tolerating bare paths.
fn path_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(u) => u.path().to_owned(),
        Err(_) => url.split('?').next().unwrap_or(url).to_owned(),
    }
}

/// The `v` query parameter, the platform's video id carrier.
fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sg_adblock::{parse_list, RuleEngine};
    use sg_domain::config::ShieldConfig;

    fn pipeline_with(list: &str) -> (NetworkPipeline, Arc<TranscriptStore>, Arc<EventBus>) {
        let engine = Arc::new(RuleEngine::with_rules(parse_list("test", list).rules));
        let config = ShieldConfig::default();
        let interceptor = Arc::new(Interceptor::new(engine, &config));
        let transcripts = Arc::new(TranscriptStore::new());
        let bus = Arc::new(EventBus::new());
        let pipeline = NetworkPipeline::new(
            interceptor,
            Arc::new(ResponseInspector::new(true)),
            Arc::new(ManifestRewriter::new(&config.ad_url_patterns)),
            transcripts.clone(),
            bus.clone(),
            config.caption_endpoints.clone(),
        );
        (pipeline, transcripts, bus)
    }

    #[test]
    fn blocked_request_emits_bus_event() {
        let (pipeline, _, bus) = pipeline_with("||ads.example.com^\n");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        bus.subscribe(move |e| {
            if let WorkspaceEvent::RequestBlocked { url, .. } = e {
                sink.lock().push(url.clone());
            }
        });

        let decision = pipeline.on_request(
            "a1",
            "https://ads.example.com/a.js",
            "script",
            None,
            "GET",
            &[],
        );
        assert!(decision.block);
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn unparseable_url_degrades_to_allow() {
        let (pipeline, _, _) = pipeline_with("||ads.example.com^\n");
        let decision = pipeline.on_request("a1", "not-a-url", "script", None, "GET", &[]);
        assert!(!decision.block);
    }

    #[test]
    fn caption_response_lands_in_the_store() {
        let (pipeline, transcripts, bus) = pipeline_with("");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |e| {
            if let WorkspaceEvent::TranscriptAvailable { video_id, segments, .. } = e {
                sink.lock().push((video_id.clone(), *segments));
            }
        });

        let body = r#"{"events":[{"tStartMs":0,"dDurationMs":2000,"segs":[{"utf8":"hello"}]}]}"#;
        let ctx = ResponseContext {
            url: "https://www.youtube.com/api/timedtext?v=abc123&lang=en",
            content_type: "application/json",
            video_id: None,
            language: Some("en"),
        };
        let out = pipeline.on_response("a1", &ctx, body);

        // Caption bodies pass through unmodified.
        assert_eq!(out, body);
        let key = VideoKey::new("a1", "abc123");
        assert!(transcripts.has(&key));
        assert_eq!(transcripts.full_text(&key), "hello");
        assert_eq!(seen.lock().as_slice(), &[("abc123".to_string(), 1)]);
    }

    #[test]
    fn caption_without_video_id_is_dropped() {
        let (pipeline, transcripts, _) = pipeline_with("");
        let body = r#"{"events":[{"tStartMs":0,"dDurationMs":1,"segs":[{"utf8":"x"}]}]}"#;
        let ctx = ResponseContext {
            url: "https://www.youtube.com/api/timedtext?lang=en",
            content_type: "application/json",
            ..Default::default()
        };
        pipeline.on_response("a1", &ctx, body);
        assert_eq!(transcripts.len(), 0);
    }

    #[test]
    fn json_responses_go_through_the_inspector() {
        let (pipeline, _, _) = pipeline_with("");
        let ctx = ResponseContext {
            url: "https://www.youtube.com/youtubei/v1/player?key=x",
            content_type: "application/json",
            ..Default::default()
        };
        let body = r#"{"videoDetails":{"title":"t"},"adPlacements":[1]}"#;
        let out = pipeline.on_response("a1", &ctx, body);
        assert!(!out.contains("adPlacements"));
        assert!(out.contains("videoDetails"));
    }

    #[test]
    fn manifests_go_through_the_rewriter() {
        let (pipeline, _, _) = pipeline_with("");
        let ctx = ResponseContext {
            url: "https://cdn.example.com/stream.m3u8",
            content_type: "application/vnd.apple.mpegurl",
            ..Default::default()
        };
        let body = "#EXTM3U\n#EXT-X-CUE-OUT:DURATION=30\n#EXTINF:10.0,\nad1.ts\n#EXT-X-CUE-IN\n#EXTINF:10.0,\ncontent.ts\n";
        let out = pipeline.on_response("a1", &ctx, body);
        assert!(!out.contains("ad1.ts"));
        assert!(out.contains("content.ts"));
    }

    #[test]
    fn other_bodies_pass_through_untouched() {
        let (pipeline, _, _) = pipeline_with("");
        let ctx = ResponseContext {
            url: "https://example.com/page",
            content_type: "text/html",
            ..Default::default()
        };
        assert_eq!(pipeline.on_response("a1", &ctx, "<html></html>"), "<html></html>");
    }
}
