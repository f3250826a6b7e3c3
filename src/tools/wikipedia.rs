use super::bounded::BoundedExecutor;
use super::{http_client, truncate_chars, WIKIPEDIA_TOOL};
use crate::config::Settings;
use crate::error::ToolError;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

pub const WIKIPEDIA_API_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const TOP_K_RESULTS: usize = 2;
const MAX_CHARS: usize = 2000;
const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Clone)]
pub struct Wikipedia {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikipediaArgs {
    pub query: String,
}

impl Wikipedia {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: WIKIPEDIA_API_ENDPOINT.to_string(),
            timeout: settings.search_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(http_client(settings.search_timeout)?, settings))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &str) -> String {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let query = query.to_string();
        BoundedExecutor::new(WIKIPEDIA_TOOL, self.timeout)
            .execute(async move {
                let response: Value = client
                    .get(&endpoint)
                    .query(&[
                        ("action", "query"),
                        ("format", "json"),
                        ("formatversion", "2"),
                        ("generator", "search"),
                        ("gsrsearch", query.as_str()),
                        ("gsrlimit", "2"),
                        ("prop", "extracts"),
                        ("exintro", "1"),
                        ("explaintext", "1"),
                        ("redirects", "1"),
                    ])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(format_pages(&response))
            })
            .await
    }
}

/// Renders the top pages of a `generator=search` response, best match first.
pub fn format_pages(response: &Value) -> String {
    let mut pages: Vec<&Value> = response
        .pointer("/query/pages")
        .and_then(Value::as_array)
        .map(|pages| pages.iter().collect())
        .unwrap_or_default();
    pages.sort_by_key(|page| page.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX));

    let summaries: Vec<String> = pages
        .into_iter()
        .filter_map(|page| {
            let title = page.get("title").and_then(Value::as_str)?;
            let extract = page.get("extract").and_then(Value::as_str).unwrap_or_default();
            Some(format!("Page: {title}\nSummary: {}", extract.trim()))
        })
        .take(TOP_K_RESULTS)
        .collect();

    if summaries.is_empty() {
        return NO_RESULTS.to_string();
    }
    truncate_chars(&summaries.join("\n\n"), MAX_CHARS)
}

impl Tool for Wikipedia {
    const NAME: &'static str = WIKIPEDIA_TOOL;

    type Error = ToolError;
    type Args = WikipediaArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search Wikipedia and return relevant summaries.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Query to look up on Wikipedia"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        Ok(self.lookup(&args.query).await)
    }
}
