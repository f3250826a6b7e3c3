use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*```(?:json)?").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*$").unwrap());
static OBJECT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Best-effort JSON object recovery from model text.
///
/// Tries the text with any code fence removed, then the first `{...}` span.
/// Anything that does not end up as a JSON object yields an empty map.
pub fn extract_json(text: &str) -> Map<String, Value> {
    let unfenced = strip_fence(text);
    let parsed = parse(unfenced).or_else(|| {
        OBJECT_SPAN
            .find(text)
            .and_then(|span| parse(span.as_str()))
    });
    match parsed {
        Some(Value::Object(object)) => object,
        Some(_) => {
            debug!("model answer parsed to a non-object JSON value");
            Map::new()
        }
        None => {
            debug!(len = text.len(), "no JSON object found in model answer");
            Map::new()
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let start = FENCE_OPEN.find(text).map_or(0, |m| m.end());
    let rest = &text[start..];
    let end = FENCE_CLOSE.find(rest).map_or(rest.len(), |m| m.start());
    rest[..end].trim()
}

fn parse(candidate: &str) -> Option<Value> {
    serde_json::from_str(candidate.trim()).ok()
}
