use anyhow::Result;
use research_agent::config::Settings;
use research_agent::server::{router, AppState};
use research_agent::tasks::ResearcherAgent;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_agent=debug,tower_http=info".into()),
        )
        .init();

    let settings = Arc::new(Settings::from_env());
    if settings.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; research runs will return minimal results");
    }

    let state = AppState::new(
        Arc::new(ResearcherAgent::new(settings.clone())),
        settings.max_sessions,
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Research agent server running on http://{}", settings.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
