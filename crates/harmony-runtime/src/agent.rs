use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::executor::ToolExecutor;
use crate::llm::provider::LLMProvider;
use crate::llm::types::*;
use crate::report::ToolReport;

/// Appended to the transcript when the operator interrupts a response.
pub const INTERRUPTED_NOTE: &str = "_[response interrupted by user]_";

/// Per-session knobs for the model loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub system_prompt: String,
    /// Model round-trips allowed for a single user turn
    pub max_iterations: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Empty keeps the provider's configured model
    pub model: String,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding assistant working in a local \
workspace. Use the `python` and `shell` tools to inspect and run code, `apply_patch` to \
edit files, and `cache` to page through long outputs that were truncated.";

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 25,
            temperature: 0.7,
            max_tokens: 4096,
            model: String::new(),
        }
    }
}

/// In-memory conversation history for one chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// Cumulative token usage across all LLM calls in this session
    #[serde(default)]
    pub cumulative_usage: Usage,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            cumulative_usage: Usage::default(),
        }
    }

    pub fn add_message(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// How a user turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Final assistant text
    Completed(String),
    /// Interrupted by the operator; no proposed tool call was run
    Interrupted,
}

/// Conversation loop: prompt → LLM → tool calls → execute → observe → repeat
pub struct Agent {
    pub config: AgentConfig,
    provider: Arc<dyn LLMProvider>,
    executor: Arc<ToolExecutor>,
    pub session: Session,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn LLMProvider>,
        executor: Arc<ToolExecutor>,
    ) -> Self {
        Self {
            config,
            provider,
            executor,
            session: Session::new(),
        }
    }

    /// Process one user message through the agent loop.
    ///
    /// `observer` sees every tool call together with its report, in dispatch
    /// order. Cancelling `cancel` only interrupts a pending model request;
    /// a tool call that already started runs to completion.
    pub async fn process_message(
        &mut self,
        user_msg: &str,
        cancel: &CancellationToken,
        observer: &mut (dyn FnMut(&ToolCall, &ToolReport) + Send),
    ) -> Result<TurnOutcome> {
        self.session.add_message(Message::user(user_msg));

        let gen_config = GenerateConfig {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system_prompt: Some(self.config.system_prompt.clone()),
        };
        let tools: Vec<ToolSchema> = self
            .executor
            .schemas()
            .into_iter()
            .map(ToolSchema::from)
            .collect();

        let mut iteration = 0;
        loop {
            let pending = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.provider.generate(&self.session.messages, &tools, &gen_config) => Some(result),
            };

            let response = match pending {
                Some(result) => result?,
                None => {
                    warn!(session = %self.session.id, "Model response interrupted");
                    self.session.add_message(Message::assistant(Content::Text {
                        text: INTERRUPTED_NOTE.to_string(),
                    }));
                    return Ok(TurnOutcome::Interrupted);
                }
            };

            self.session.cumulative_usage += response.usage.clone();
            info!(
                model = %response.model,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                cumulative_tokens = self.session.cumulative_usage.total(),
                "LLM response received"
            );

            // A turn cancelled after the response arrived still drops its tool calls.
            if cancel.is_cancelled() {
                let text = response.content.text();
                let text = if text.is_empty() {
                    INTERRUPTED_NOTE.to_string()
                } else {
                    format!("{text}\n\n{INTERRUPTED_NOTE}")
                };
                self.session
                    .add_message(Message::assistant(Content::Text { text }));
                return Ok(TurnOutcome::Interrupted);
            }

            self.session
                .add_message(Message::assistant(response.content.clone()));

            let calls = response.content.tool_calls();
            if calls.is_empty() {
                return match response.stop_reason {
                    StopReason::MaxTokens if response.content.text().is_empty() => {
                        Err(anyhow!("Model stopped at max_tokens without a reply"))
                    }
                    _ => Ok(TurnOutcome::Completed(response.content.text().to_string())),
                };
            }

            for call in calls {
                info!(tool = %call.name, id = %call.id, "Dispatching tool call");
                let report = self.executor.execute(&call.name, call.input.clone()).await;
                observer(call, &report);
                self.session
                    .add_message(Message::tool_result(ToolResult::from_report(call, report)));
            }

            iteration += 1;
            if iteration >= self.config.max_iterations {
                warn!(
                    max = self.config.max_iterations,
                    "Max iterations reached, stopping agent loop"
                );
                return Err(anyhow!(
                    "Max iterations ({}) reached",
                    self.config.max_iterations
                ));
            }
        }
    }
}
