use crate::models::{ResearchRequest, ResearchResponse};
use crate::tasks::{render_markdown, run_research, AgentInvoker};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Completed runs by session id. Holds at most `capacity` entries; the oldest
/// session is evicted first.
#[derive(Debug)]
pub struct SessionStore {
    entries: DashMap<String, ResearchResponse>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&self, session_id: String, response: ResearchResponse) {
        let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        while order.len() >= self.capacity {
            let Some(oldest) = order.pop_front() else { break };
            self.entries.remove(&oldest);
            debug!("Evicted session {}", oldest);
        }
        order.push_back(session_id.clone());
        self.entries.insert(session_id, response);
    }

    pub fn get(&self, session_id: &str) -> Option<ResearchResponse> {
        self.entries.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<dyn AgentInvoker>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(agent: Arc<dyn AgentInvoker>, max_sessions: usize) -> Self {
        Self {
            agent,
            sessions: Arc::new(SessionStore::new(max_sessions)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/research", post(research))
        .route("/research/:session_id", get(get_research))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[instrument(skip(state, req))]
async fn research(
    State(state): State<AppState>,
    Json(req): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, StatusCode> {
    if req.query.trim().is_empty() {
        warn!("Rejecting research request with an empty query");
        return Err(StatusCode::BAD_REQUEST);
    }

    let start_time = std::time::Instant::now();
    let session_id = Uuid::new_v4().to_string();
    info!("Starting research for session {}", session_id);

    let result = run_research(state.agent.as_ref(), &req).await;
    let response = ResearchResponse {
        session_id: session_id.clone(),
        markdown: render_markdown(&result),
        result,
        total_time_ms: start_time.elapsed().as_millis() as u64,
    };

    info!("Research for session {} finished in {:?}", session_id, start_time.elapsed());
    state.sessions.insert(session_id, response.clone());
    Ok(Json(response))
}

async fn get_research(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResearchResponse>, StatusCode> {
    state
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{AgentRun, ToolCallRecord, TraceMessage};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct CannedAgent;

    #[async_trait]
    impl AgentInvoker for CannedAgent {
        async fn invoke(&self, _prompt: &str) -> anyhow::Result<AgentRun> {
            Ok(AgentRun {
                messages: vec![
                    TraceMessage::tool_call(ToolCallRecord::new("Search", json!({"query": "q"}))),
                    TraceMessage::tool_output(
                        "Search",
                        json!([{"title": "t", "link": "https://a.example", "snippet": "Alpha."}])
                            .to_string(),
                    ),
                    TraceMessage::assistant("{\"topic\": \"Quantum computing\"}"),
                ],
                ..AgentRun::default()
            })
        }
    }

    fn app() -> (Router, AppState) {
        let state = AppState::new(Arc::new(CannedAgent), 16);
        (router(state.clone()), state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_research(body: Value) -> Request<Body> {
        Request::post("/research")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn research_returns_and_stores_complete_result() {
        let (app, state) = app();
        let response = app
            .clone()
            .oneshot(post_research(json!({"query": "What is quantum computing?", "style": "news"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["topic"], "Quantum computing");
        assert_eq!(body["style"], "explainer");
        assert_eq!(body["summary"], "Alpha.");
        assert_eq!(body["sources"], json!(["https://a.example"]));
        assert_eq!(body["tools_used"], json!(["Search"]));
        assert_eq!(body["why_these_sources"], json!([]));
        assert_eq!(body["freshness_notes"], "");
        assert!(body["markdown"].as_str().unwrap().starts_with("# Quantum computing"));

        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(state.sessions.contains(&session_id));

        let stored = app
            .oneshot(
                Request::get(format!("/research/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(stored.status(), StatusCode::OK);
        assert_eq!(body_json(stored).await["session_id"], session_id.as_str());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(post_research(json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/research/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oldest_sessions_are_evicted_past_capacity() {
        let state = AppState::new(Arc::new(CannedAgent), 2);
        let app = router(state.clone());
        let mut ids = Vec::new();
        for query in ["first", "second", "third"] {
            let response = app
                .clone()
                .oneshot(post_research(json!({"query": query})))
                .await
                .unwrap();
            let body = body_json(response).await;
            ids.push(body["session_id"].as_str().unwrap().to_string());
        }

        assert_eq!(state.sessions.len(), 2);
        let evicted = app
            .clone()
            .oneshot(
                Request::get(format!("/research/{}", ids[0]))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(evicted.status(), StatusCode::NOT_FOUND);
        assert!(state.sessions.contains(&ids[1]));
        assert!(state.sessions.contains(&ids[2]));
    }
}
