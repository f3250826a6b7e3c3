use super::{dedup_preserving_order, TraceMessage};
use crate::tools::SENTINEL_PREFIX;
use serde_json::{Map, Value};
use tracing::debug;

const LINK_KEYS: [&str; 2] = ["link", "url"];

/// Links returned by `tool_name`, deduplicated in the order they were seen.
pub fn extract_links(messages: &[TraceMessage], tool_name: &str) -> Vec<String> {
    mine(messages, tool_name, |record| {
        LINK_KEYS.iter().find_map(|key| {
            record
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|link| has_web_scheme(link))
                .map(str::to_string)
        })
    })
}

/// Non-empty snippets returned by `tool_name`, deduplicated in order.
pub fn extract_snippets(messages: &[TraceMessage], tool_name: &str) -> Vec<String> {
    mine(messages, tool_name, |record| {
        let snippet = record.get("snippet").and_then(Value::as_str)?.trim();
        if snippet.is_empty() || is_sentinel(record, snippet) {
            return None;
        }
        Some(snippet.to_string())
    })
}

fn mine<F>(messages: &[TraceMessage], tool_name: &str, field: F) -> Vec<String>
where
    F: Fn(&Map<String, Value>) -> Option<String>,
{
    let found = messages
        .iter()
        .filter(|message| message.is_tool() && message.name.as_deref() == Some(tool_name))
        .fold(Vec::new(), |mut acc, message| {
            if let Some(records) = parse_records(message) {
                acc.extend(records.iter().filter_map(Value::as_object).filter_map(&field));
            }
            acc
        });
    dedup_preserving_order(found)
}

/// One message's payload, or `None` when it is not a JSON list.
fn parse_records(message: &TraceMessage) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(&message.text()) {
        Ok(Value::Array(records)) => Some(records),
        Ok(_) => {
            debug!(tool = ?message.name, "tool output is not a JSON list; skipping");
            None
        }
        Err(err) => {
            debug!(tool = ?message.name, error = %err, "tool output is not valid JSON; skipping");
            None
        }
    }
}

fn has_web_scheme(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

fn is_sentinel(record: &Map<String, Value>, snippet: &str) -> bool {
    let link = record.get("link").and_then(Value::as_str).unwrap_or_default();
    link.is_empty() && snippet.starts_with(SENTINEL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_output(payload: &str) -> TraceMessage {
        TraceMessage::tool_output("Search", payload)
    }

    #[test]
    fn extracts_links_from_both_key_names() {
        let messages = vec![
            search_output(
                &json!([
                    {"title": "A", "link": "https://a.example", "snippet": "alpha"},
                    {"title": "B", "url": "http://b.example", "snippet": "beta"},
                    {"title": "C", "link": "ftp://c.example", "snippet": "gamma"},
                    {"title": "D", "link": "https://a.example", "snippet": "alpha"}
                ])
                .to_string(),
            ),
        ];
        assert_eq!(
            extract_links(&messages, "Search"),
            ["https://a.example", "http://b.example"]
        );
        assert_eq!(
            extract_snippets(&messages, "Search"),
            ["alpha", "beta", "gamma"]
        );
    }

    #[test]
    fn unusable_link_falls_back_to_url_key() {
        let messages = vec![search_output(
            &json!([
                {"title": "Empty", "link": "", "url": "https://alt.example"},
                {"title": "Relative", "link": "/local", "url": "http://rel.example"}
            ])
            .to_string(),
        )];
        assert_eq!(
            extract_links(&messages, "Search"),
            ["https://alt.example", "http://rel.example"]
        );
    }

    #[test]
    fn malformed_message_does_not_stop_the_scan() {
        let messages = vec![
            search_output("this is not json"),
            search_output(r#"{"link": "https://object.example"}"#),
            search_output(r#"[1, "two", null, {"link": "https://ok.example", "snippet": "ok"}]"#),
        ];
        assert_eq!(extract_links(&messages, "Search"), ["https://ok.example"]);
        assert_eq!(extract_snippets(&messages, "Search"), ["ok"]);
    }

    #[test]
    fn only_matching_tool_messages_are_mined() {
        let payload = json!([{"link": "https://w.example", "snippet": "wiki"}]).to_string();
        let messages = vec![
            TraceMessage::tool_output("Wikipedia", payload.clone()),
            TraceMessage::assistant(payload),
        ];
        assert!(extract_links(&messages, "Search").is_empty());
        assert_eq!(extract_links(&messages, "Wikipedia"), ["https://w.example"]);
    }

    #[test]
    fn sentinel_records_contribute_nothing() {
        let messages = vec![search_output(
            &json!([{"title": "", "link": "", "snippet": "ERROR: Search timed out after 8s"}])
                .to_string(),
        )];
        assert!(extract_links(&messages, "Search").is_empty());
        assert!(extract_snippets(&messages, "Search").is_empty());
    }

    #[test]
    fn content_blocks_are_flattened_before_parsing() {
        let message = TraceMessage::from_value(&json!({
            "type": "tool",
            "name": "Search",
            "content": [{"type": "text", "text": "[{\"link\": \"https://blocks.example\"}]"}]
        }));
        assert_eq!(extract_links(&[message], "Search"), ["https://blocks.example"]);
    }
}
