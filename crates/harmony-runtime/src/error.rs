use thiserror::Error;

/// Every failure a tool call can surface. `ToolExecutor` turns each of these
/// into the same `## Error` envelope, so callers never branch on the variant.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool `{name}` not found.")]
    UnknownTool { name: String },

    #[error("Invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Execution timed out after {secs}s.")]
    Timeout { secs: u64 },

    /// The child process could not be spawned or awaited. A non-zero exit
    /// code is not an execution failure.
    #[error("Execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Cache ID '{id}' not found.")]
    CacheMiss { id: String },

    #[error("{message}")]
    InvalidRange { message: String },

    #[error("Tool `{name}` is already registered")]
    DuplicateTool { name: String },

    #[error("Tool `{tool}` panicked: {message}")]
    Panicked { tool: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolError {
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }
}
