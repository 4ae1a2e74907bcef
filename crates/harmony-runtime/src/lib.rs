pub mod agent;
pub mod error;
pub mod executor;
pub mod llm;
pub mod markdown;
pub mod report;
pub mod tool;

pub use agent::{Agent, AgentConfig, Session, TurnOutcome};
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use llm::{
    Content, GenerateConfig, GenerateResponse, LLMProvider, Message, OpenAIClient, Role,
    StopReason, ToolCall, ToolResult, ToolSchema, Usage,
};
pub use report::ToolReport;
pub use tool::{parse_args, Tool, ToolSchemaInfo};

/// Initialize logging on stderr, filtered by `RUST_LOG` (default `warn`).
/// Stdout stays reserved for tool output.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    // A second call (tests, embedding) keeps the first subscriber.
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
