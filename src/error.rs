use crate::trace::TraceMessage;
use thiserror::Error;

/// Failures a tool reports back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool execution failed for {tool}: {message}")]
    ExecutionFailed { tool: String, message: String },
    #[error("tool I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

/// An agent run that stopped before producing its final answer.
/// Carries whatever trace was recorded up to that point.
#[derive(Debug, Error)]
#[error("agent run interrupted: {reason}")]
pub struct InterruptedRun {
    pub reason: String,
    pub partial_trace: Vec<TraceMessage>,
}
