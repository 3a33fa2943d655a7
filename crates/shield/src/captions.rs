//! Caption-traffic parsing.
//!
//! The primary entry point understands the platform's JSON3 format
//! (`events` or `segments` arrays of `{tStartMs, dDurationMs, segs}`);
//! the secondary one takes WebVTT text. Parse failures produce an empty
//! segment list, never a panic; captioning payloads are best-effort.

use serde_json::Value;

use sg_domain::Segment;

/// Parse a JSON3 captioning payload into ordered segments.
///
/// Entries without a start time are skipped; a missing or malformed
/// duration coerces to zero length; entries with no visible text are
/// dropped.
pub fn parse_json3(body: &str) -> Vec<Segment> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    let events = value
        .get("events")
        .or_else(|| value.get("segments"))
        .and_then(Value::as_array);
    let Some(events) = events else {
        return Vec::new();
    };

    let mut segments: Vec<Segment> = Vec::new();
    for event in events {
        let Some(start_ms) = event.get("tStartMs").and_then(as_millis) else {
            continue;
        };
        let duration_ms = event
            .get("dDurationMs")
            .and_then(as_millis)
            .unwrap_or(0.0);

        let text = match event.get("segs").and_then(Value::as_array) {
            Some(segs) => segs
                .iter()
                .filter_map(|s| s.get("utf8").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(""),
            None => String::new(),
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let start_s = start_ms / 1000.0;
        segments.push(Segment::new(start_s, start_s + duration_ms / 1000.0, text));
    }

    segments.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
    segments
}

fn as_millis(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|ms| ms.is_finite() && *ms >= 0.0),
        _ => None,
    }
}

/// Parse WebVTT text into ordered segments.
pub fn parse_webvtt(body: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut lines = body.lines().peekable();

    while let Some(line) = lines.next() {
        let Some((start, end)) = parse_cue_timing(line) else {
            continue;
        };

        let mut text = String::new();
        for cue_line in lines.by_ref() {
            let cue_line = cue_line.trim();
            if cue_line.is_empty() {
                break;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(cue_line);
        }

        if !text.trim().is_empty() {
            segments.push(Segment::new(start, end, text.trim()));
        }
    }

    segments.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
    segments
}

/// Parse a `00:00:01.000 --> 00:00:04.000` cue line. Cue settings after
/// the end timestamp are ignored.
fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.trim().split_once("-->")?;
    let end = rest.trim().split_whitespace().next()?;
    Some((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm` to seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let parts: Vec<&str> = ts.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s),
        _ => return None,
    };
    let seconds = s.parse::<f64>().ok()?;
    Some(h * 3600.0 + m * 60.0 + seconds)
}
