use super::{http_client, truncate_chars, LOAD_URL_TOOL};
use crate::error::ToolError;
use once_cell::sync::Lazy;
use regex::Regex;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{instrument, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(12);
const MAX_CHARS: usize = 8000;
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

#[derive(Debug, Clone)]
pub struct LoadUrl {
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadUrlArgs {
    pub url: String,
}

impl LoadUrl {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_defaults() -> anyhow::Result<Self> {
        Ok(Self::new(http_client(FETCH_TIMEOUT)?))
    }

    /// Cleaned page text, or an `ERROR...` line the model can read.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> String {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return "ERROR: URL must start with http:// or https://".to_string();
        }
        match self.fetch_html(url).await {
            Ok(html) => truncate_chars(&clean_text(&html), MAX_CHARS),
            Err(err) => {
                warn!(url, error = %err, "page fetch failed");
                format!("ERROR fetching URL: {err}")
            }
        }
    }

    async fn fetch_html(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Visible text of an HTML document, one text node per line.
pub fn clean_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let lines: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some((node, text)),
            _ => None,
        })
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            })
        })
        .map(|(_, text)| text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

impl Tool for LoadUrl {
    const NAME: &'static str = LOAD_URL_TOOL;

    type Error = ToolError;
    type Args = LoadUrlArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Fetch and return cleaned text content from a public URL.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Public URL starting with http:// or https://"
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self.fetch(&args.url).await)
    }
}
