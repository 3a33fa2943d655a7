//! JSON response-body inspection.
//!
//! Two code paths: platform endpoints we know carry ad payloads get the
//! closed field set plus two structural passes (engagement panels,
//! shelf entries); everything else gets a smaller permissive key set
//! when generic stripping is enabled. A body that fails to parse is
//! returned untouched and counts nothing.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use sg_domain::trace::TraceEvent;

/// Ad-carrying field names on recognized platform endpoints.
const KNOWN_AD_FIELDS: &[&str] = &[
    "adPlacements",
    "playerAds",
    "adSlots",
    "adBreakParams",
    "adBreakHeartbeatParams",
    "adSlotRenderer",
    "displayAdRenderer",
    "promotedSparklesWebRenderer",
    "bannerPromoRenderer",
    "invideoOverlayAdRenderer",
    "playerLegacyDesktopWatchAdsRenderer",
];

/// Permissive key set applied to unrecognized JSON responses.
const GENERIC_AD_FIELDS: &[&str] = &[
    "advertisement",
    "sponsored",
    "promo",
    "ad_data",
    "adData",
    "tracking_pixels",
    "trackingPixels",
];

/// Shelf renderers removed from results containers.
const SHELF_FIELDS: &[&str] = &["merchandiseShelfRenderer", "ticketShelfRenderer"];

/// Default recognized endpoint path fragments.
const KNOWN_ENDPOINTS: &[&str] = &[
    "/youtubei/v1/player",
    "/youtubei/v1/next",
    "/youtubei/v1/browse",
    "/youtubei/v1/search",
    "/api/stats/ads",
];

/// Result of inspecting one response body.
#[derive(Debug)]
pub struct StripReport {
    pub content: String,
    pub modified: bool,
    pub bytes_removed: usize,
    /// Dot-joined paths of every deleted property.
    pub fields_stripped: Vec<String>,
}

impl StripReport {
    fn unchanged(body: &str) -> Self {
        Self {
            content: body.to_owned(),
            modified: false,
            bytes_removed: 0,
            fields_stripped: Vec::new(),
        }
    }
}

/// Walks JSON response bodies and deletes ad-carrying fields.
pub struct ResponseInspector {
    generic_stripping: bool,
    modified_responses: AtomicU64,
}

impl ResponseInspector {
    pub fn new(generic_stripping: bool) -> Self {
        Self {
            generic_stripping,
            modified_responses: AtomicU64::new(0),
        }
    }

    /// Number of responses actually modified since startup.
    pub fn modified_count(&self) -> u64 {
        self.modified_responses.load(Ordering::Relaxed)
    }

    /// Inspect one response. Non-JSON content types and unparseable
    /// bodies come back unchanged.
    pub fn inspect(&self, url_path: &str, content_type: &str, body: &str) -> StripReport {
        if !content_type.to_ascii_lowercase().contains("json") {
            return StripReport::unchanged(body);
        }
        let Ok(mut value) = serde_json::from_str::<Value>(body) else {
            return StripReport::unchanged(body);
        };

        let known = KNOWN_ENDPOINTS.iter().any(|e| url_path.contains(e));
        if !known && !self.generic_stripping {
            return StripReport::unchanged(body);
        }

        let before = canonical_len(&value);
        let mut stripped = Vec::new();

        if known {
            delete_fields(&mut value, KNOWN_AD_FIELDS, &mut String::new(), &mut stripped);
            filter_engagement_panels(&mut value, &mut stripped);
            delete_shelf_entries(&mut value, &mut stripped);
        } else {
            delete_fields(&mut value, GENERIC_AD_FIELDS, &mut String::new(), &mut stripped);
        }

        if stripped.is_empty() {
            return StripReport::unchanged(body);
        }

        let content = value.to_string();
        let bytes_removed = before.saturating_sub(canonical_len(&value));
        self.modified_responses.fetch_add(1, Ordering::Relaxed);
        TraceEvent::ResponseStripped {
            endpoint: url_path.to_owned(),
            fields: stripped.len(),
            bytes_removed,
        }
        .emit();

        StripReport {
            content,
            modified: true,
            bytes_removed,
            fields_stripped: stripped,
        }
    }
}

fn canonical_len(value: &Value) -> usize {
    value.to_string().len()
}

/// Recursively delete any property whose key is in `fields`, recording
/// the dot-joined path of each deletion.
fn delete_fields(value: &mut Value, fields: &[&str], path: &mut String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let doomed: Vec<String> = map
                .keys()
                .filter(|k| fields.contains(&k.as_str()))
                .cloned()
                .collect();
            for key in doomed {
                map.remove(&key);
                out.push(join_path(path, &key));
            }
            for (key, child) in map.iter_mut() {
                let len = path.len();
                push_path(path, key);
                delete_fields(child, fields, path, out);
                path.truncate(len);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter_mut().enumerate() {
                let len = path.len();
                push_path(path, &i.to_string());
                delete_fields(child, fields, path, out);
                path.truncate(len);
            }
        }
        _ => {}
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

fn push_path(path: &mut String, key: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(key);
}

/// Drop engagement-panel items whose panel identifier mentions ads or
/// promos.
fn filter_engagement_panels(value: &mut Value, out: &mut Vec<String>) {
    walk_arrays_named(value, "engagementPanels", &mut |items| {
        items.retain(|item| {
            let doomed = find_string_value(item, "panelIdentifier")
                .map(|id| {
                    let id = id.to_ascii_lowercase();
                    id.contains("ads") || id.contains("promo")
                })
                .unwrap_or(false);
            if doomed {
                out.push("engagementPanels".into());
            }
            !doomed
        });
    });
}

/// Remove array entries that are merchandise or ticket shelves.
fn delete_shelf_entries(value: &mut Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            items.retain(|item| {
                let doomed = item
                    .as_object()
                    .map(|o| SHELF_FIELDS.iter().any(|f| o.contains_key(*f)))
                    .unwrap_or(false);
                if doomed {
                    out.push("shelf".into());
                }
                !doomed
            });
            for item in items.iter_mut() {
                delete_shelf_entries(item, out);
            }
        }
        Value::Object(map) => {
            for (_, child) in map.iter_mut() {
                delete_shelf_entries(child, out);
            }
        }
        _ => {}
    }
}

/// Apply `f` to every array stored under a key named `name`, anywhere.
fn walk_arrays_named(value: &mut Value, name: &str, f: &mut impl FnMut(&mut Vec<Value>)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == name {
                    if let Value::Array(items) = child {
                        f(items);
                    }
                }
                walk_arrays_named(child, name, f);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                walk_arrays_named(child, name, f);
            }
        }
        _ => {}
    }
}

/// Depth-first search for the first string stored under `key`.
fn find_string_value<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get(key) {
                return Some(s);
            }
            map.values().find_map(|v| find_string_value(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_string_value(v, key)),
        _ => None,
    }
}
