//! Streaming-manifest rewriting.
//!
//! DASH presentations get regex-based structural edits (no full XML
//! parse, so unusual whitespace or namespaced attributes can defeat
//! them); HLS playlists are processed line by line. Everything not
//! removed is preserved byte-for-byte.

use regex::Regex;

use sg_domain::trace::TraceEvent;

/// HLS marker lines that open an ad break; the following segment URI
/// (and its `#EXTINF`) goes with them.
const HLS_AD_START_MARKERS: &[&str] = &[
    "#EXT-X-CUE-OUT",
    "#EXT-X-SCTE35",
    "#EXT-OATCLS-SCTE35",
    "#EXT-X-ASSET",
];

/// DATERANGE classes that mark server-side ad insertion.
const HLS_INTERSTITIAL_CLASSES: &[&str] = &[
    "com.apple.hls.interstitial",
    "urn:google:dai",
    "twitch-stitched-ad",
];

/// Result of one rewrite pass.
#[derive(Debug)]
pub struct RewriteResult {
    pub content: String,
    pub modified: bool,
    /// Removed marker lines and segment URIs. Companion `#EXTINF` and
    /// `#EXT-X-DISCONTINUITY` lines are dropped but not counted.
    pub segments_removed: usize,
}

impl RewriteResult {
    fn unchanged(body: &str) -> Self {
        Self {
            content: body.to_owned(),
            modified: false,
            segments_removed: 0,
        }
    }
}

/// Strips ad periods and segments from DASH and HLS manifests.
pub struct ManifestRewriter {
    ad_url: Vec<Regex>,
    dash_period: Regex,
    dash_segment: Regex,
    dash_adaptation: Regex,
    dash_eventstream: Regex,
}

impl ManifestRewriter {
    /// Build a rewriter from the configured ad-URL patterns. Invalid
    /// patterns are dropped (config validation already warned).
    pub fn new(ad_url_patterns: &[String]) -> Self {
        let ad_url = ad_url_patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            ad_url,
            dash_period: Regex::new(r#"(?s)<Period[^>]*\bid="[^"]*ad[^"]*"[^>]*>.*?</Period>"#)
                .expect("static regex"),
            dash_segment: Regex::new(r#"<S\b[^>]*\bmedia="([^"]*)"[^>]*/>"#)
                .expect("static regex"),
            dash_adaptation: Regex::new(
                r#"(?s)<AdaptationSet[^>]*\bcontentType="ad"[^>]*>.*?</AdaptationSet>"#,
            )
            .expect("static regex"),
            dash_eventstream: Regex::new(
                r#"(?s)<EventStream[^>]*\bschemeIdUri="[^"]*ad[^"]*"[^>]*>.*?</EventStream>"#,
            )
            .expect("static regex"),
        }
    }

    fn is_ad_url(&self, candidate: &str) -> bool {
        self.ad_url.iter().any(|re| re.is_match(candidate))
    }

    /// Rewrite one manifest body. Non-manifest content comes back
    /// unchanged.
    pub fn rewrite(&self, content_type: &str, body: &str) -> RewriteResult {
        let ct = content_type.to_ascii_lowercase();
        let result = if body.trim_start().starts_with("#EXTM3U") || ct.contains("mpegurl") {
            self.rewrite_hls(body)
        } else if body.contains("<MPD") || ct.contains("dash+xml") {
            self.rewrite_dash(body)
        } else {
            RewriteResult::unchanged(body)
        };

        if result.modified {
            TraceEvent::ManifestRewritten {
                kind: if ct.contains("dash") || body.contains("<MPD") {
                    "dash".into()
                } else {
                    "hls".into()
                },
                segments_removed: result.segments_removed,
            }
            .emit();
        }
        result
    }

    // ── DASH ───────────────────────────────────────────────────────

    fn rewrite_dash(&self, body: &str) -> RewriteResult {
        let mut removed = 0usize;
        let mut content = body.to_owned();

        for re in [&self.dash_period, &self.dash_adaptation, &self.dash_eventstream] {
            removed += re.find_iter(&content).count();
            content = re.replace_all(&content, "").into_owned();
        }

        // Segment entries are only removed when their media URL matches
        // a configured ad pattern.
        let mut seg_removed = 0usize;
        content = self
            .dash_segment
            .replace_all(&content, |caps: &regex::Captures<'_>| {
                if self.is_ad_url(&caps[1]) {
                    seg_removed += 1;
                    String::new()
                } else {
                    caps[0].to_owned()
                }
            })
            .into_owned();
        removed += seg_removed;

        RewriteResult {
            modified: removed > 0,
            segments_removed: removed,
            content,
        }
    }

    // ── HLS ────────────────────────────────────────────────────────

    fn rewrite_hls(&self, body: &str) -> RewriteResult {
        let mut out: Vec<&str> = Vec::new();
        let mut removed = 0usize;
        let mut modified = false;
        // An ad-start marker was dropped; the next segment URI goes too.
        let mut pending_segment_skip = false;
        // A segment URI was just dropped; an adjacent discontinuity goes.
        let mut just_removed_segment = false;

        for line in body.split('\n') {
            let t = line.trim_end_matches('\r').trim();

            if HLS_AD_START_MARKERS.iter().any(|m| t.starts_with(m)) {
                removed += 1;
                modified = true;
                pending_segment_skip = true;
                continue;
            }
            if t.starts_with("#EXT-X-DATERANGE") {
                removed += 1;
                modified = true;
                let lowered = t.to_ascii_lowercase();
                if HLS_INTERSTITIAL_CLASSES.iter().any(|c| lowered.contains(c)) {
                    pending_segment_skip = true;
                }
                continue;
            }
            if t.starts_with("#EXT-X-CUE-IN") {
                removed += 1;
                modified = true;
                continue;
            }

            if pending_segment_skip {
                if t.starts_with("#EXTINF") {
                    // Companion line of the segment being dropped.
                    modified = true;
                    continue;
                }
                if t.is_empty() || t.starts_with('#') {
                    out.push(line);
                    continue;
                }
                removed += 1;
                modified = true;
                pending_segment_skip = false;
                just_removed_segment = true;
                continue;
            }

            if !t.is_empty() && !t.starts_with('#') && self.is_ad_url(t) {
                // Ad segment by URL: drop it with its companion lines.
                while let Some(last) = out.last() {
                    let lt = last.trim_end_matches('\r').trim();
                    if lt.starts_with("#EXTINF") || lt == "#EXT-X-DISCONTINUITY" {
                        out.pop();
                    } else {
                        break;
                    }
                }
                removed += 1;
                modified = true;
                just_removed_segment = true;
                continue;
            }

            if t == "#EXT-X-DISCONTINUITY" && just_removed_segment {
                modified = true;
                just_removed_segment = false;
                continue;
            }
            if !t.is_empty() {
                just_removed_segment = false;
            }
            out.push(line);
        }

        RewriteResult {
            content: out.join("\n"),
            modified,
            segments_removed: removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> ManifestRewriter {
        ManifestRewriter::new(&["ad-?segment".to_string(), r"/ads?/".to_string()])
    }

    #[test]
    fn cue_out_break_is_removed_content_kept() {
        let input = "#EXTM3U\n\
                     #EXT-X-CUE-OUT:DURATION=30\n\
                     #EXTINF:10.0,\n\
                     ad-segment-1.ts\n\
                     #EXT-X-CUE-IN\n\
                     #EXTINF:10.0,\n\
                     content-1.ts\n";
        let result = rewriter().rewrite("application/vnd.apple.mpegurl", input);

        assert!(result.modified);
        assert_eq!(result.segments_removed, 3);
        assert_eq!(result.content, "#EXTM3U\n#EXTINF:10.0,\ncontent-1.ts\n");
    }

    #[test]
    fn ad_url_segment_is_removed_with_its_extinf() {
        let input = "#EXTM3U\n\
                     #EXTINF:6.0,\n\
                     content-1.ts\n\
                     #EXTINF:6.0,\n\
                     https://cdn.example.com/ads/break1.ts\n\
                     #EXTINF:6.0,\n\
                     content-2.ts\n";
        let result = rewriter().rewrite("", input);

        assert!(result.modified);
        assert_eq!(result.segments_removed, 1);
        assert!(!result.content.contains("/ads/"));
        assert!(result.content.contains("content-1.ts"));
        assert!(result.content.contains("content-2.ts"));
        // Exactly two EXTINF lines remain.
        assert_eq!(result.content.matches("#EXTINF").count(), 2);
    }

    #[test]
    fn discontinuity_around_removed_segment_goes_too() {
        let input = "#EXTM3U\n\
                     #EXTINF:6.0,\n\
                     content-1.ts\n\
                     #EXT-X-DISCONTINUITY\n\
                     #EXTINF:6.0,\n\
                     ad-segment.ts\n\
                     #EXT-X-DISCONTINUITY\n\
                     #EXTINF:6.0,\n\
                     content-2.ts\n";
        let result = rewriter().rewrite("", input);

        assert!(result.modified);
        assert!(!result.content.contains("DISCONTINUITY"));
        assert!(result.content.contains("content-1.ts"));
        assert!(result.content.contains("content-2.ts"));
    }

    #[test]
    fn interstitial_daterange_consumes_next_segment() {
        let input = "#EXTM3U\n\
                     #EXT-X-DATERANGE:ID=\"x\",CLASS=\"com.apple.hls.interstitial\",START-DATE=\"2026-01-01T00:00:00Z\"\n\
                     #EXTINF:10.0,\n\
                     break.ts\n\
                     #EXTINF:10.0,\n\
                     content-1.ts\n";
        let result = rewriter().rewrite("", input);

        assert_eq!(result.segments_removed, 2);
        assert!(!result.content.contains("break.ts"));
        assert!(result.content.contains("content-1.ts"));
    }

    #[test]
    fn clean_playlist_is_untouched() {
        let input = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:10.0,\ncontent-1.ts\n";
        let result = rewriter().rewrite("application/vnd.apple.mpegurl", input);
        assert!(!result.modified);
        assert_eq!(result.segments_removed, 0);
        assert_eq!(result.content, input);
    }

    #[test]
    fn dash_ad_period_is_removed() {
        let input = r#"<?xml version="1.0"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011">
  <Period id="content-1" duration="PT30S">
    <AdaptationSet contentType="video"/>
  </Period>
  <Period id="ad-break-1" duration="PT15S">
    <AdaptationSet contentType="video"/>
  </Period>
</MPD>
"#;
        let result = rewriter().rewrite("application/dash+xml", input);
        assert!(result.modified);
        assert_eq!(result.segments_removed, 1);
        assert!(!result.content.contains("ad-break-1"));
        assert!(result.content.contains("content-1"));
    }

    #[test]
    fn dash_ad_adaptation_and_eventstream_are_removed() {
        let input = r#"<MPD>
  <Period id="p1">
    <EventStream schemeIdUri="urn:scte:scte35:2013:xml:ad">
      <Event/>
    </EventStream>
    <AdaptationSet contentType="ad">
      <Representation/>
    </AdaptationSet>
    <AdaptationSet contentType="video">
      <SegmentTimeline>
        <S media="https://cdn.example.com/ads/seg1.mp4" d="90000"/>
        <S media="https://cdn.example.com/media/seg2.mp4" d="90000"/>
      </SegmentTimeline>
    </AdaptationSet>
  </Period>
</MPD>
"#;
        let result = rewriter().rewrite("application/dash+xml", input);
        assert!(result.modified);
        assert_eq!(result.segments_removed, 3);
        assert!(!result.content.contains("contentType=\"ad\""));
        assert!(!result.content.contains("EventStream"));
        assert!(!result.content.contains("/ads/seg1"));
        assert!(result.content.contains("/media/seg2"));
    }

    #[test]
    fn non_manifest_body_is_unchanged() {
        let result = rewriter().rewrite("text/plain", "hello world");
        assert!(!result.modified);
        assert_eq!(result.content, "hello world");
    }
}
