mod extractor;
mod reconciler;
mod reporter;
mod researcher;

pub use extractor::extract_json;
pub use reconciler::{reconcile, MAX_FALLBACK_SOURCES};
pub use reporter::render_markdown;
pub use researcher::{derive_result, run_research, AgentInvoker, ResearcherAgent};
