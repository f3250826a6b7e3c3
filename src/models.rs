use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "default_safe")]
    pub safe: bool,
}

fn default_safe() -> bool {
    true
}

impl ResearchRequest {
    /// Prompt handed to the agent: the requested framing followed by the bare query.
    pub fn prompt(&self) -> String {
        format!(
            "[style={}; safe={}] {}",
            self.style,
            self.safe,
            self.query.trim()
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub result: ResearchResult,
    pub markdown: String,
    pub total_time_ms: u64,
}

/// The report every run produces. All fields are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub topic: String,
    pub style: Style,
    pub summary: String,
    pub sources: Vec<String>,
    pub tools_used: Vec<String>,
    pub why_these_sources: Vec<String>,
    pub freshness_notes: String,
}

impl ResearchResult {
    /// Minimal valid result used when a run cannot produce anything better.
    pub fn minimal(query: &str, tools_used: Vec<String>) -> Self {
        Self {
            topic: query.to_string(),
            style: Style::default(),
            summary: String::new(),
            sources: Vec::new(),
            tools_used,
            why_these_sources: Vec::new(),
            freshness_notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    #[default]
    #[serde(rename = "explainer")]
    Explainer,
    #[serde(rename = "news")]
    News,
    #[serde(rename = "pros & cons")]
    ProsAndCons,
    #[serde(rename = "timeline")]
    Timeline,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Explainer,
        Style::News,
        Style::ProsAndCons,
        Style::Timeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Explainer => "explainer",
            Style::News => "news",
            Style::ProsAndCons => "pros & cons",
            Style::Timeline => "timeline",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the enumeration.
    pub fn parse(value: &str) -> Option<Style> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl SearchHit {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            link: String::new(),
            snippet: message.into(),
        }
    }
}
