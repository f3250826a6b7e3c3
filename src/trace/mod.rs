//! Normalized view of an agent run's message trace.
//!
//! Traces arrive either as JSON envelopes (`{"messages": [...], "output": ...}`)
//! whose messages may tag their author with `type` or `role`, or as typed
//! records built by the in-process agent. Both are converted into
//! [`TraceMessage`] here so the extractors only deal with one shape.

mod ledger;
mod miner;
mod text;

pub use ledger::extract_tool_names;
pub use miner::{extract_links, extract_snippets};
pub use text::final_assistant_text;

use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
    Unknown,
}

impl Role {
    /// Resolves the author from the two tags a message may carry.
    /// `type` uses `ai`/`human` vocabulary, `role` the chat-completions one.
    pub fn from_tags(kind: Option<&str>, role: Option<&str>) -> Role {
        let by_kind = kind.map(|kind| match kind {
            "ai" | "assistant" => Role::Assistant,
            "human" | "user" => Role::User,
            "tool" => Role::Tool,
            "system" => Role::System,
            _ => Role::Unknown,
        });
        let by_role = role.map(|role| match role {
            "assistant" => Role::Assistant,
            "user" => Role::User,
            "tool" => Role::Tool,
            "system" => Role::System,
            _ => Role::Unknown,
        });
        match (by_kind, by_role) {
            (Some(Role::Assistant), _) | (_, Some(Role::Assistant)) => Role::Assistant,
            (Some(role), _) if role != Role::Unknown => role,
            (_, Some(role)) => role,
            _ => Role::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text(String),
    Fields(Map<String, Value>),
    Other(Value),
}

impl ContentBlock {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => ContentBlock::Text(text.clone()),
            Value::Object(fields) => ContentBlock::Fields(fields.clone()),
            other => ContentBlock::Other(other.clone()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            ContentBlock::Text(text) => text.clone(),
            ContentBlock::Fields(fields) => fields
                .get("text")
                .filter(|v| !is_blank(v))
                .or_else(|| fields.get("content"))
                .map(value_to_text)
                .unwrap_or_default(),
            ContentBlock::Other(value) => value_to_text(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(Value),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl Content {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Content::Text(text.clone()),
            Value::Array(items) => {
                Content::Blocks(items.iter().map(ContentBlock::from_value).collect())
            }
            Value::Null => Content::default(),
            other => Content::Other(other.clone()),
        }
    }

    /// Flattens the content into plain text.
    pub fn to_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .map(ContentBlock::to_text)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Content::Other(value) => value_to_text(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallRecord {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    /// Accepts `{"name": ...}` as well as the nested `{"function": {"name": ...}}`
    /// descriptor. Descriptors without a usable name are dropped.
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let function = fields.get("function").and_then(Value::as_object);
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| function.and_then(|f| f.get("name")).and_then(Value::as_str))
            .filter(|name| !name.is_empty())?;
        let arguments = fields
            .get("args")
            .or_else(|| fields.get("arguments"))
            .or_else(|| function.and_then(|f| f.get("arguments")))
            .cloned()
            .unwrap_or(Value::Null);
        Some(Self {
            id: fields.get("id").and_then(Value::as_str).map(str::to_string),
            name: name.to_string(),
            arguments,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceMessage {
    pub role: Role,
    pub name: Option<String>,
    pub content: Content,
    pub tool_calls: Vec<ToolCallRecord>,
}

impl TraceMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    pub fn tool_call(call: ToolCallRecord) -> Self {
        Self {
            role: Role::Assistant,
            name: None,
            content: Content::default(),
            tool_calls: vec![call],
        }
    }

    pub fn tool_output(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: Some(tool.into()),
            ..Self::with_text(Role::Tool, output)
        }
    }

    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: Content::Text(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Normalizes one JSON-shaped trace entry. Unknown shapes still produce a
    /// message (with `Role::Unknown`) so positional fallbacks keep working.
    pub fn from_value(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self {
                role: Role::Unknown,
                name: None,
                content: Content::from_value(value),
                tool_calls: Vec::new(),
            };
        };

        let role = Role::from_tags(
            fields.get("type").and_then(Value::as_str),
            fields.get("role").and_then(Value::as_str),
        );
        let tool_calls = fields
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(ToolCallRecord::from_value).collect())
            .unwrap_or_default();

        Self {
            role,
            name: fields.get("name").and_then(Value::as_str).map(str::to_string),
            content: fields.get("content").map(Content::from_value).unwrap_or_default(),
            tool_calls,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    pub fn is_tool(&self) -> bool {
        self.role == Role::Tool
    }

    pub fn text(&self) -> String {
        self.content.to_text()
    }
}

/// What one agent invocation hands back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentRun {
    pub messages: Vec<TraceMessage>,
    pub structured_response: Option<Value>,
    pub output: Option<String>,
}

impl AgentRun {
    pub fn from_value(value: &Value) -> Self {
        let messages = value
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(TraceMessage::from_value).collect())
            .unwrap_or_default();
        let structured_response = ["structured_response", "structuredResponse", "structured"]
            .iter()
            .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
            .cloned();
        let output = value
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            messages,
            structured_response,
            output,
        }
    }
}

/// Deduplicates while keeping the first occurrence of every entry.
pub(crate) fn dedup_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}
