use super::export::{SaveJson, SaveText};
use super::load_url::LoadUrl;
use super::recorder::TraceRecorder;
use super::search::WebSearch;
use super::wikipedia::Wikipedia;
use crate::config::Settings;
use anyhow::Result;
use rig::prelude::*;
use rig::providers::openai;

pub type LLMAgent = rig::agent::Agent<openai::CompletionModel>;

pub const SYSTEM_PROMPT: &str = r#"You are a careful research assistant. You can use tools to search, fetch a URL, and save JSON/TXT.

The user message starts with "[style=...; safe=...]" followed by the query.

Rules:
- Include at least 3 source URLs in "sources" (deduplicated, working links taken from tool results).
- Add 2-3 bullets in "why_these_sources" explaining selection (authority, recency, diversity).
- In "freshness_notes", indicate which sources are <30 days old and which look older.
- Keep "summary" concise but factual and cite sources inline by [#] indices when natural.
- Respect "style": explainer, news, pros & cons, timeline.
- If the query looks like medical/financial/legal advice, or safe=true, respond conservatively.

Answer with a single JSON object and no other text:
{"topic": string, "style": string, "summary": string, "sources": [string], "tools_used": [string], "why_these_sources": [string], "freshness_notes": string}"#;

/// Builds the research agent with every tool wrapped by `recorder`.
pub fn get_research_agent(settings: &Settings, recorder: &TraceRecorder) -> Result<LLMAgent> {
    let api_key = settings
        .openai_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("OpenAI API key not configured"))?;
    let client = openai::Client::new(api_key);

    Ok(client
        .agent(&settings.model)
        .preamble(SYSTEM_PROMPT)
        .temperature(0.0)
        .tool(recorder.wrap(WebSearch::from_settings(settings)?))
        .tool(recorder.wrap(Wikipedia::from_settings(settings)?))
        .tool(recorder.wrap(SaveJson::new(&settings.export_dir)))
        .tool(recorder.wrap(LoadUrl::from_defaults()?))
        .tool(recorder.wrap(SaveText::new(&settings.export_dir)))
        .build())
}
