use super::extractor::extract_json;
use super::reconciler::reconcile;
use crate::config::Settings;
use crate::error::InterruptedRun;
use crate::models::{ResearchRequest, ResearchResult};
use crate::tools::llm::get_research_agent;
use crate::tools::recorder::TraceRecorder;
use crate::tools::SEARCH_TOOL;
use crate::trace::{
    extract_links, extract_snippets, extract_tool_names, final_assistant_text, AgentRun,
    TraceMessage,
};
use async_trait::async_trait;
use futures::FutureExt;
use rig::completion::Prompt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Runs the LLM with its tools and hands back the resulting trace.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str) -> anyhow::Result<AgentRun>;
}

/// The production agent: an OpenAI model driven through rig's tool loop.
pub struct ResearcherAgent {
    settings: Arc<Settings>,
}

impl ResearcherAgent {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl AgentInvoker for ResearcherAgent {
    #[instrument(skip(self))]
    async fn invoke(&self, prompt: &str) -> anyhow::Result<AgentRun> {
        let recorder = TraceRecorder::default();
        recorder.record(TraceMessage::user(prompt));

        let agent = get_research_agent(&self.settings, &recorder)?;
        let prompt = prompt.to_string();
        let answer = agent
            .prompt(&prompt)
            .multi_turn(self.settings.max_tool_turns)
            .await
            .map_err(|e| InterruptedRun {
                reason: format!("Prompt error: {e}"),
                partial_trace: recorder.snapshot(),
            })?;

        info!("Agent answered with {} characters", answer.len());
        recorder.record(TraceMessage::assistant(answer.clone()));
        Ok(AgentRun {
            messages: recorder.snapshot(),
            structured_response: None,
            output: Some(answer),
        })
    }
}

/// Runs one research request end to end. Always returns a complete result:
/// agent failures and panics degrade to a minimal report. An interrupted run
/// still reports the tools it managed to call.
#[instrument(skip(agent, request), fields(query = %request.query))]
pub async fn run_research(agent: &dyn AgentInvoker, request: &ResearchRequest) -> ResearchResult {
    let query = request.query.trim();
    let prompt = request.prompt();

    let run = match AssertUnwindSafe(agent.invoke(&prompt)).catch_unwind().await {
        Ok(Ok(run)) => run,
        Ok(Err(err)) => {
            error!("Agent invocation failed: {:#}", err);
            let used_tools = err
                .downcast_ref::<InterruptedRun>()
                .map(|run| extract_tool_names(&run.partial_trace))
                .unwrap_or_default();
            return ResearchResult::minimal(query, used_tools);
        }
        Err(_) => {
            error!("Agent invocation panicked");
            return ResearchResult::minimal(query, Vec::new());
        }
    };

    let used_tools = extract_tool_names(&run.messages);
    info!("Agent run used tools {:?}", used_tools);

    match std::panic::catch_unwind(AssertUnwindSafe(|| derive_result(&run, query, &used_tools))) {
        Ok(result) => result,
        Err(_) => {
            error!("Result derivation panicked; returning minimal result");
            ResearchResult::minimal(query, used_tools)
        }
    }
}

/// Extracts everything usable from a finished run and reconciles it.
pub fn derive_result(run: &AgentRun, query: &str, used_tools: &[String]) -> ResearchResult {
    let raw_text = final_assistant_text(run);
    let parsed = match run.structured_response.as_ref().filter(|v| v.is_object()) {
        Some(structured) => structured.clone(),
        None => Value::Object(extract_json(&raw_text)),
    };
    if parsed.as_object().is_some_and(|fields| fields.is_empty()) {
        warn!("Model answer carried no structured fields; relying on fallbacks");
    }

    let fallback_sources = extract_links(&run.messages, SEARCH_TOOL);
    let fallback_snippets = extract_snippets(&run.messages, SEARCH_TOOL);
    debug!(
        sources = fallback_sources.len(),
        snippets = fallback_snippets.len(),
        "mined search output"
    );

    reconcile(
        &parsed,
        query,
        used_tools,
        &fallback_sources,
        &fallback_snippets,
        &raw_text,
    )
}
