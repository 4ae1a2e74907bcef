use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::markdown::{display_truncate, DISPLAY_MAX_LINES};

const ERROR_HEADING: &str = "## Error\n";

/// The pair every tool call returns: `model_text` re-enters the conversation,
/// `display_text` is what the operator sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReport {
    pub model_text: String,
    pub display_text: String,
}

impl ToolReport {
    pub fn new(model_text: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            model_text: model_text.into(),
            display_text: display_text.into(),
        }
    }

    /// Model view is the full markdown, display view is the line-capped copy.
    pub fn from_markdown(markdown: String, display_max_lines: usize) -> Self {
        let display_text = display_truncate(&markdown, display_max_lines);
        Self {
            model_text: markdown,
            display_text,
        }
    }

    /// Error envelope shared by dispatch failures and handler failures.
    pub fn error(err: &ToolError) -> Self {
        Self::error_message(err)
    }

    pub fn error_message(message: impl std::fmt::Display) -> Self {
        let markdown = format!("{ERROR_HEADING}{message}");
        Self::from_markdown(markdown, DISPLAY_MAX_LINES)
    }

    pub fn is_error(&self) -> bool {
        self.model_text.starts_with(ERROR_HEADING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let report = ToolReport::error(&ToolError::UnknownTool {
            name: "nope".into(),
        });
        assert_eq!(report.model_text, "## Error\nTool `nope` not found.");
        assert_eq!(report.display_text, report.model_text);
        assert!(report.is_error());
    }

    #[test]
    fn test_plain_report_is_not_error() {
        let report = ToolReport::from_markdown("## Command Successful\n".into(), 25);
        assert!(!report.is_error());
    }
}
