use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::ToolReport;
use crate::tool::ToolSchemaInfo;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Carries a tool report back to the model
    Tool,
}

/// Body of a transcript entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text {
        text: String,
    },
    /// Assistant turn that asks for one or more tool calls, optionally with
    /// some prose in front of them
    ToolCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    ToolResult(ToolResult),
}

impl Content {
    pub fn text(&self) -> &str {
        match self {
            Content::Text { text } => text,
            Content::ToolCalls {
                text: Some(text), ..
            } => text,
            _ => "",
        }
    }

    /// Proposed calls in the order the model listed them
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Content::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }
}

/// One function call proposed by the model. `input` is kept verbatim when
/// the model's argument string was not valid JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Only the model view of a report re-enters the conversation.
    pub fn from_report(call: &ToolCall, report: ToolReport) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            is_error: report.is_error(),
            output: report.model_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    fn text(role: Role, text: &str) -> Self {
        Self {
            role,
            content: Content::Text {
                text: text.to_string(),
            },
        }
    }

    pub fn system(text: &str) -> Self {
        Self::text(Role::System, text)
    }

    pub fn user(text: &str) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(content: Content) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: Content::ToolResult(result),
        }
    }
}

/// Function definition advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<ToolSchemaInfo> for ToolSchema {
    fn from(info: ToolSchemaInfo) -> Self {
        Self {
            name: info.name,
            description: info.description,
            input_schema: info.parameters,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: Content,
    pub stop_reason: StopReason,
    pub usage: Usage,
    pub model: String,
}

/// Per-request sampling settings; an empty `model` means the provider default
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
            system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "shell".into(),
            input: json!({"command": "ls"}),
        }
    }

    #[test]
    fn test_tool_calls_keep_text_and_order() {
        let content = Content::ToolCalls {
            text: Some("Let me check.".into()),
            calls: vec![call("c1"), call("c2")],
        };
        assert_eq!(content.text(), "Let me check.");
        let ids: Vec<&str> = content.tool_calls().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let plain = Content::Text { text: "done".into() };
        assert!(plain.tool_calls().is_empty());
    }

    #[test]
    fn test_result_from_error_report() {
        let report = ToolReport::error_message("Execution timed out after 1s.");
        let result = ToolResult::from_report(&call("c9"), report);
        assert_eq!(result.call_id, "c9");
        assert_eq!(result.tool_name, "shell");
        assert!(result.is_error);
        assert_eq!(Message::tool_result(result).role, Role::Tool);
    }

    #[test]
    fn test_schema_conversion() {
        let schema: ToolSchema = ToolSchemaInfo {
            name: "cache".into(),
            description: "d".into(),
            parameters: json!({"type": "object"}),
        }
        .into();
        assert_eq!(schema.name, "cache");
        assert_eq!(schema.input_schema["type"], "object");
    }
}
