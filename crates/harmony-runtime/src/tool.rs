use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::report::ToolReport;

/// Async Tool trait
/// Note: Uses async_trait for trait object compatibility with DashMap storage
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute tool with its named-argument object
    async fn execute(&self, input: Value) -> Result<ToolReport, ToolError>;

    /// Tool name for registration
    fn name(&self) -> &str;

    /// JSON schema advertised to the model
    fn schema(&self) -> ToolSchemaInfo;
}

/// Name, description and parameter schema of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchemaInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Deserialize a tool's argument object into its typed form.
pub fn parse_args<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::invalid_arguments(tool, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Args {
        code: String,
        #[serde(default)]
        timeout: Option<u64>,
    }

    #[test]
    fn test_parse_args_ok() {
        let args: Args = parse_args("exec", json!({"code": "ls"})).unwrap();
        assert_eq!(args.code, "ls");
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_missing() {
        let err = parse_args::<Args>("exec", json!({"cmd": "ls"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(err.to_string().starts_with("Invalid arguments for `exec`"));

        let err = parse_args::<Args>("exec", Value::Null).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
