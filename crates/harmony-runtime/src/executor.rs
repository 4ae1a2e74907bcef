use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::report::ToolReport;
use crate::tool::{Tool, ToolSchemaInfo};

/// Single dispatch point from tool name to handler.
///
/// `execute` never fails: unknown names, bad arguments, handler errors and
/// handler panics all come back as the same error-envelope `ToolReport`.
pub struct ToolExecutor {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Register a tool under its own name
    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Schemas of every registered tool, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchemaInfo> {
        let mut schemas: Vec<ToolSchemaInfo> =
            self.tools.iter().map(|e| e.value().schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Run one tool call to completion.
    pub async fn execute(&self, tool_name: &str, input: Value) -> ToolReport {
        let tool = match self.tools.get(tool_name) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                warn!(tool = tool_name, "Unknown tool requested");
                return ToolReport::error(&ToolError::UnknownTool {
                    name: tool_name.to_string(),
                });
            }
        };

        info!(tool = tool_name, "Executing tool");

        match AssertUnwindSafe(tool.execute(input)).catch_unwind().await {
            Ok(Ok(report)) => {
                info!(tool = tool_name, "Tool completed");
                report
            }
            Ok(Err(err)) => {
                warn!(tool = tool_name, error = %err, "Tool failed");
                ToolReport::error(&err)
            }
            Err(payload) => {
                let err = ToolError::Panicked {
                    tool: tool_name.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                warn!(tool = tool_name, error = %err, "Tool panicked");
                ToolReport::error(&err)
            }
        }
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
