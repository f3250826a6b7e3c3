pub mod bounded;
pub mod export;
pub mod llm;
pub mod load_url;
pub mod recorder;
pub mod search;
pub mod wikipedia;

use anyhow::Result;
use std::time::Duration;

/// Every sentinel text starts with this marker.
pub const SENTINEL_PREFIX: &str = "ERROR:";

pub const SEARCH_TOOL: &str = "Search";
pub const WIKIPEDIA_TOOL: &str = "Wikipedia";
pub const LOAD_URL_TOOL: &str = "LoadURL";
pub const SAVE_JSON_TOOL: &str = "SaveJSON";
pub const SAVE_TEXT_TOOL: &str = "Save_Text_File";

pub const USER_AGENT: &str = "Mozilla/5.0 (research-agent)";

pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// First `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
