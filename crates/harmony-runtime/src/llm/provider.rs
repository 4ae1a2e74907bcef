use anyhow::Result;
use async_trait::async_trait;

use super::types::{GenerateConfig, GenerateResponse, Message, ToolSchema};

/// Transport to the language model. The harness only needs one request per
/// model turn; everything behind this trait is an external collaborator.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a response for the conversation so far
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        config: &GenerateConfig,
    ) -> Result<GenerateResponse>;

    /// Provider model name for logging/tracking
    fn model_name(&self) -> &str;
}
