use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::provider::LLMProvider;
use super::types::*;

/// Default endpoint: a local OpenAI-compatible server
pub const DEFAULT_API_URL: &str = "http://localhost:8080/v1/chat/completions";

/// Client for any OpenAI-compatible Chat Completions endpoint
pub struct OpenAIClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: None,
            model: String::new(),
        })
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        if !key.is_empty() {
            self.api_key = Some(key.to_string());
        }
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Build Chat Completions request body
    fn build_request_body(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        config: &GenerateConfig,
    ) -> Value {
        let model = if config.model.is_empty() {
            &self.model
        } else {
            &config.model
        };

        let mut body = json!({
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "messages": self.build_messages(messages, config),
        });
        if !model.is_empty() {
            body["model"] = json!(model);
        }

        if !tools.is_empty() {
            let api_tools: Vec<Value> = tools.iter().map(tool_to_api).collect();
            body["tools"] = json!(api_tools);
        }

        body
    }

    /// Build messages array (system prompt + conversation)
    fn build_messages(&self, messages: &[Message], config: &GenerateConfig) -> Vec<Value> {
        let mut api_msgs = Vec::new();

        if let Some(ref sys) = config.system_prompt {
            api_msgs.push(json!({"role": "system", "content": sys}));
        }

        for msg in messages {
            match (&msg.role, &msg.content) {
                (Role::System, Content::Text { text }) => {
                    api_msgs.push(json!({"role": "system", "content": text}));
                }
                (Role::User, Content::Text { text }) => {
                    api_msgs.push(json!({"role": "user", "content": text}));
                }
                (Role::Tool, Content::ToolResult(tr)) => {
                    api_msgs.push(json!({
                        "role": "tool",
                        "tool_call_id": tr.call_id,
                        "name": tr.tool_name,
                        "content": tr.output,
                    }));
                }
                (Role::Assistant, Content::Text { text }) => {
                    api_msgs.push(json!({"role": "assistant", "content": text}));
                }
                (Role::Assistant, Content::ToolCalls { text, calls }) => {
                    let calls: Vec<Value> = calls.iter().map(tool_call_to_api).collect();
                    let mut msg_json = json!({"role": "assistant", "tool_calls": calls});
                    if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                        msg_json["content"] = json!(text);
                    }
                    api_msgs.push(msg_json);
                }
                _ => {}
            }
        }

        api_msgs
    }

    /// Parse Chat Completions response
    fn parse_response(&self, body: ApiResponse) -> Result<GenerateResponse> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No choices in model response"))?;

        let text = choice.message.content.filter(|t| !t.is_empty());
        let calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Malformed argument JSON is passed on as-is; dispatch reports it.
                let input = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    input,
                }
            })
            .collect();

        let has_tool_calls = !calls.is_empty();
        let content = if has_tool_calls {
            Content::ToolCalls { text, calls }
        } else {
            Content::Text {
                text: text.unwrap_or_default(),
            }
        };

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ if has_tool_calls => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };

        let usage = body
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(GenerateResponse {
            content,
            stop_reason,
            usage,
            model: body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

fn tool_to_api(tool: &ToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn tool_call_to_api(tc: &ToolCall) -> Value {
    let arguments = match &tc.input {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    json!({
        "id": tc.id,
        "type": "function",
        "function": {
            "name": tc.name,
            "arguments": arguments,
        }
    })
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        config: &GenerateConfig,
    ) -> Result<GenerateResponse> {
        let body = self.build_request_body(messages, tools, config);
        debug!(url = %self.api_url, messages = messages.len(), "Sending completion request");

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.context("Model request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Model API error ({}): {}", status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .context("Failed to decode model response")?;
        self.parse_response(api_response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ApiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
