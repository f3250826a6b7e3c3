use super::bounded::BoundedExecutor;
use super::{http_client, SEARCH_TOOL};
use crate::config::{Settings, SEARCH_MAX_RESULTS_RANGE, SEARCH_TIMEOUT_SECS_RANGE};
use crate::error::ToolError;
use crate::models::SearchHit;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use reqwest::header::ACCEPT;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").unwrap());
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").unwrap());
static RESULT_SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__snippet, .result__snippet").unwrap());

/// Web search backed by the DuckDuckGo HTML endpoint. Never fails: timeouts
/// and transport errors come back as a one-hit sentinel list.
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub timeout_s: Option<u64>,
}

impl WebSearch {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: DUCKDUCKGO_HTML_ENDPOINT.to_string(),
            max_results: settings.search_max_results,
            timeout: settings.search_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        // The executor owns the deadline; the client timeout is only a backstop.
        let backstop = Duration::from_secs(SEARCH_TIMEOUT_SECS_RANGE.1 + 5);
        Ok(Self::new(http_client(backstop)?, settings))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Clamps the model-supplied limits into the allowed ranges.
    fn limits(&self, args: &SearchArgs) -> (usize, Duration) {
        let (lo, hi) = SEARCH_MAX_RESULTS_RANGE;
        let max_results = args.max_results.unwrap_or(self.max_results).clamp(lo, hi);
        let (lo, hi) = SEARCH_TIMEOUT_SECS_RANGE;
        let timeout = args
            .timeout_s
            .map(|secs| Duration::from_secs(secs.clamp(lo, hi)))
            .unwrap_or(self.timeout);
        (max_results, timeout)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: usize, timeout: Duration) -> Vec<SearchHit> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let query = query.to_string();
        let hits = BoundedExecutor::new(SEARCH_TOOL, timeout)
            .execute(async move { fetch_hits(&client, &endpoint, &query, max_results).await })
            .await;
        debug!(hits = hits.len(), "search finished");
        hits
    }
}

async fn fetch_hits(
    client: &reqwest::Client,
    endpoint: &str,
    query: &str,
    max_results: usize,
) -> anyhow::Result<Vec<SearchHit>> {
    let body = client
        .post(endpoint)
        .form(&[("q", query)])
        .header(ACCEPT, "text/html")
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_results(&body, max_results))
}

/// Pulls `{title, link, snippet}` records out of a DuckDuckGo HTML result page.
/// Results without a link are dropped.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT)
        .filter_map(|result| {
            let anchor = result.select(&RESULT_LINK).next()?;
            let link = anchor.value().attr("href").map(decode_redirect)?;
            if link.is_empty() {
                return None;
            }
            let title = collapse(&anchor.text().collect::<String>());
            let snippet = result
                .select(&RESULT_SNIPPET)
                .next()
                .map(|el| collapse(&el.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchHit {
                title,
                link,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn decode_redirect(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + 5..];
        let encoded = encoded.split('&').next().unwrap_or_default();
        if !encoded.is_empty() {
            return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
        }
    }
    href.trim().to_string()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Tool for WebSearch {
    const NAME: &'static str = SEARCH_TOOL;

    type Error = ToolError;
    type Args = SearchArgs;
    type Output = Vec<SearchHit>;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web and returns a JSON list of {title, link, snippet}. \
                Use these links; do not invent new ones."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "max_results": {
                        "type": "integer",
                        "minimum": SEARCH_MAX_RESULTS_RANGE.0,
                        "maximum": SEARCH_MAX_RESULTS_RANGE.1,
                        "description": "Max number of results"
                    },
                    "timeout_s": {
                        "type": "integer",
                        "minimum": SEARCH_TIMEOUT_SECS_RANGE.0,
                        "maximum": SEARCH_TIMEOUT_SECS_RANGE.1,
                        "description": "Timeout seconds"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let (max_results, timeout) = self.limits(&args);
        Ok(self.search(&args.query, max_results, timeout).await)
    }
}
