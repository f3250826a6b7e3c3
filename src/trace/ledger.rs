use super::{dedup_preserving_order, TraceMessage};

/// Names of every tool the run invoked, in first-invocation order.
pub fn extract_tool_names(messages: &[TraceMessage]) -> Vec<String> {
    dedup_preserving_order(
        messages
            .iter()
            .flat_map(|message| message.tool_calls.iter())
            .filter(|call| !call.name.is_empty())
            .map(|call| call.name.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::ToolCallRecord;
    use serde_json::{json, Value};

    #[test]
    fn keeps_first_occurrence_order() {
        let messages = vec![
            TraceMessage::user("research this"),
            TraceMessage::tool_call(ToolCallRecord::new("Search", json!({"query": "a"}))),
            TraceMessage::tool_output("Search", "[]"),
            TraceMessage::tool_call(ToolCallRecord::new("Wikipedia", json!({"query": "a"}))),
            TraceMessage::tool_call(ToolCallRecord::new("Search", json!({"query": "b"}))),
            TraceMessage::assistant("done"),
        ];
        assert_eq!(extract_tool_names(&messages), ["Search", "Wikipedia"]);
    }

    #[test]
    fn reads_json_shaped_descriptors() {
        let messages: Vec<TraceMessage> = [
            json!({"type": "human", "content": "q"}),
            json!({"type": "ai", "tool_calls": [{"name": "LoadURL", "args": {}}]}),
            json!({"role": "assistant", "tool_calls": [{"function": {"name": "SaveJSON"}}]}),
            json!({"role": "assistant", "tool_calls": "not a list"}),
        ]
        .iter()
        .map(TraceMessage::from_value)
        .collect();
        assert_eq!(extract_tool_names(&messages), ["LoadURL", "SaveJSON"]);
    }

    #[test]
    fn empty_trace_yields_nothing() {
        assert!(extract_tool_names(&[]).is_empty());
        let nameless = TraceMessage::tool_call(ToolCallRecord::new("", Value::Null));
        assert!(extract_tool_names(&[nameless]).is_empty());
    }
}
