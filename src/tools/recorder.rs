use crate::trace::{ToolCallRecord, TraceMessage};
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Collects the trace of one agent run as its tools are called.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    messages: Arc<Mutex<Vec<TraceMessage>>>,
}

impl TraceRecorder {
    pub fn record(&self, message: TraceMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn snapshot(&self) -> Vec<TraceMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn wrap<T: Tool>(&self, tool: T) -> Recorded<T> {
        Recorded {
            inner: tool,
            recorder: self.clone(),
        }
    }
}

/// A tool whose calls and outputs are appended to a [`TraceRecorder`].
#[derive(Debug, Clone)]
pub struct Recorded<T> {
    inner: T,
    recorder: TraceRecorder,
}

impl<T> Tool for Recorded<T>
where
    T: Tool,
    T::Args: Serialize,
{
    const NAME: &'static str = T::NAME;

    type Error = T::Error;
    type Args = T::Args;
    type Output = T::Output;

    async fn definition(&self, prompt: String) -> ToolDefinition {
        self.inner.definition(prompt).await
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let arguments = serde_json::to_value(&args).unwrap_or(Value::Null);
        self.recorder
            .record(TraceMessage::tool_call(ToolCallRecord::new(T::NAME, arguments)));

        let result = self.inner.call(args).await;
        let content = match &result {
            Ok(output) => output_text(output),
            Err(err) => format!("Tool execution failed: {err}"),
        };
        debug!(tool = T::NAME, output_len = content.len(), "recorded tool output");
        self.recorder.record(TraceMessage::tool_output(T::NAME, content));
        result
    }
}

/// Output as the model sees it: strings verbatim, everything else as JSON.
fn output_text<O: Serialize>(output: &O) -> String {
    match serde_json::to_value(output) {
        Ok(Value::String(text)) => text,
        Ok(value) => value.to_string(),
        Err(err) => format!("Tool output could not be serialized: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::models::SearchHit;
    use crate::trace::{extract_links, extract_tool_names};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct CannedSearch;

    #[derive(Debug, Serialize, Deserialize)]
    struct CannedArgs {
        query: String,
    }

    impl Tool for CannedSearch {
        const NAME: &'static str = "Search";

        type Error = ToolError;
        type Args = CannedArgs;
        type Output = Vec<SearchHit>;

        async fn definition(&self, _prompt: String) -> ToolDefinition {
            ToolDefinition {
                name: Self::NAME.to_string(),
                description: "canned".to_string(),
                parameters: json!({"type": "object"}),
            }
        }

        async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
            if args.query.is_empty() {
                return Err(ToolError::invalid_arguments(Self::NAME, "empty query"));
            }
            Ok(vec![SearchHit {
                title: "A".into(),
                link: format!("https://a.example/{}", args.query),
                snippet: "alpha".into(),
            }])
        }
    }

    #[tokio::test]
    async fn records_calls_and_outputs() {
        let recorder = TraceRecorder::default();
        let tool = recorder.wrap(CannedSearch);
        tool.call(CannedArgs { query: "x".into() }).await.unwrap();
        tool.call(CannedArgs { query: String::new() }).await.unwrap_err();

        let trace = recorder.snapshot();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace[0].tool_calls[0].arguments, json!({"query": "x"}));
        assert_eq!(extract_tool_names(&trace), ["Search"]);
        assert_eq!(extract_links(&trace, "Search"), ["https://a.example/x"]);
        assert!(trace[3].text().starts_with("Tool execution failed:"));
    }

    #[test]
    fn string_outputs_are_not_quoted() {
        assert_eq!(output_text(&"plain".to_string()), "plain");
        assert_eq!(output_text(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
