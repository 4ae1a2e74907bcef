pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAIClient;
pub use provider::LLMProvider;
pub use types::{
    Content, GenerateConfig, GenerateResponse, Message, Role, StopReason, ToolCall, ToolResult,
    ToolSchema, Usage,
};
