//! Turns whatever the model produced into a complete [`ResearchResult`].

use crate::models::{ResearchResult, Style};
use crate::tools::truncate_chars;
use crate::trace::dedup_preserving_order;
use serde_json::{Map, Value};
use tracing::debug;

pub const MAX_FALLBACK_SOURCES: usize = 8;
pub const SNIPPET_SUMMARY_CHARS: usize = 900;
pub const RAW_TEXT_SUMMARY_CHARS: usize = 1500;

/// Merges a parsed (possibly empty or malformed) answer with data mined from
/// the trace. Every field of the result is filled; `sources` and `tools_used`
/// come out deduplicated.
pub fn reconcile(
    parsed: &Value,
    query: &str,
    used_tools: &[String],
    fallback_sources: &[String],
    fallback_snippets: &[String],
    raw_text: &str,
) -> ResearchResult {
    let empty = Map::new();
    let fields = parsed.as_object().unwrap_or(&empty);

    let topic = string_field(fields, "topic")
        .filter(|topic| !topic.trim().is_empty())
        .unwrap_or_else(|| query.to_string());
    let style = string_field(fields, "style")
        .and_then(|style| Style::parse(&style))
        .unwrap_or_default();
    let freshness_notes = string_field(fields, "freshness_notes").unwrap_or_default();
    let why_these_sources = list_field(fields, "why_these_sources");

    let mut tools_used = list_field(fields, "tools_used");
    if tools_used.is_empty() {
        tools_used = used_tools.to_vec();
    }

    let mut sources = list_field(fields, "sources");
    if sources.is_empty() {
        debug!(available = fallback_sources.len(), "backfilling sources from tool output");
        sources = fallback_sources
            .iter()
            .take(MAX_FALLBACK_SOURCES)
            .cloned()
            .collect();
    }

    let mut summary = string_field(fields, "summary").unwrap_or_default();
    if summary.trim().is_empty() {
        let providers: [&dyn Fn() -> Option<String>; 2] = [
            &|| summary_from_snippets(fallback_snippets),
            &|| summary_from_raw_text(raw_text),
        ];
        summary = first_available(&providers).unwrap_or_default();
    }

    ResearchResult {
        topic,
        style,
        summary,
        sources: dedup_preserving_order(
            sources.into_iter().filter(|source| !source.trim().is_empty()),
        ),
        tools_used: dedup_preserving_order(
            tools_used.into_iter().filter(|tool| !tool.is_empty()),
        ),
        why_these_sources,
        freshness_notes,
    }
}

/// Evaluates providers in order and returns the first non-empty text.
fn first_available(providers: &[&dyn Fn() -> Option<String>]) -> Option<String> {
    providers
        .iter()
        .find_map(|provide| provide().filter(|text| !text.is_empty()))
}

fn summary_from_snippets(snippets: &[String]) -> Option<String> {
    let joined = snippets.join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(truncate_chars(&collapsed, SNIPPET_SUMMARY_CHARS))
}

/// Raw model text, unless it is an unparsed JSON object.
fn summary_from_raw_text(raw_text: &str) -> Option<String> {
    let text = raw_text.trim();
    if text.starts_with('{') {
        return None;
    }
    Some(truncate_chars(text, RAW_TEXT_SUMMARY_CHARS))
}

/// A string field; `null`, missing and non-string values all count as absent.
fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A list-of-strings field. Anything that is not a list becomes empty and
/// non-string items are dropped.
fn list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
