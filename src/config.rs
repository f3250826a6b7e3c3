use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_EXPORT_DIR: &str = "exports";

pub const SEARCH_MAX_RESULTS_DEFAULT: usize = 5;
pub const SEARCH_MAX_RESULTS_RANGE: (usize, usize) = (1, 10);
pub const SEARCH_TIMEOUT_SECS_DEFAULT: u64 = 8;
pub const SEARCH_TIMEOUT_SECS_RANGE: (u64, u64) = (2, 30);
pub const MAX_TOOL_TURNS_DEFAULT: usize = 8;
pub const MAX_SESSIONS_DEFAULT: usize = 1000;

/// Process-wide settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub bind_addr: String,
    pub export_dir: PathBuf,
    pub search_max_results: usize,
    pub search_timeout: Duration,
    pub max_tool_turns: usize,
    pub max_sessions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            search_max_results: SEARCH_MAX_RESULTS_DEFAULT,
            search_timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS_DEFAULT),
            max_tool_turns: MAX_TOOL_TURNS_DEFAULT,
            max_sessions: MAX_SESSIONS_DEFAULT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let (lo, hi) = SEARCH_MAX_RESULTS_RANGE;
        let search_max_results = number(&lookup, "RESEARCH_SEARCH_MAX_RESULTS")
            .unwrap_or(defaults.search_max_results)
            .clamp(lo, hi);
        let (lo, hi) = SEARCH_TIMEOUT_SECS_RANGE;
        let search_timeout_secs = number(&lookup, "RESEARCH_SEARCH_TIMEOUT_SECS")
            .unwrap_or(SEARCH_TIMEOUT_SECS_DEFAULT)
            .clamp(lo, hi);

        Self {
            openai_api_key: text("OPENAI_API_KEY"),
            model: text("RESEARCH_MODEL").unwrap_or(defaults.model),
            bind_addr: text("RESEARCH_BIND_ADDR").unwrap_or(defaults.bind_addr),
            export_dir: text("RESEARCH_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            search_max_results,
            search_timeout: Duration::from_secs(search_timeout_secs),
            max_tool_turns: number(&lookup, "RESEARCH_MAX_TOOL_TURNS")
                .unwrap_or(defaults.max_tool_turns),
            max_sessions: number(&lookup, "RESEARCH_MAX_SESSIONS")
                .unwrap_or(defaults.max_sessions)
                .max(1),
        }
    }
}

fn number<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable setting; using default");
            None
        }
    }
}
