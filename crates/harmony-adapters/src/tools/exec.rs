use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harmony_runtime::{parse_args, Tool, ToolError, ToolReport, ToolSchemaInfo};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::exec_runner::{ExecKind, ExecRunner};
use crate::output_format::OutputFormatter;

/// Which argument shape the tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    /// `exec {kind, code}`
    Any,
    /// `python {code}` or `shell {command}`
    Fixed(ExecKind),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecArgs {
    kind: ExecKind,
    code: String,
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PythonArgs {
    code: String,
    #[serde(default)]
    timeout: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ShellArgs {
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
}

/// Runs code through `ExecRunner` and renders it with `OutputFormatter`.
pub struct ExecTool {
    surface: Surface,
    runner: Arc<ExecRunner>,
    formatter: Arc<OutputFormatter>,
}

impl ExecTool {
    /// `exec`: caller picks the kind per call.
    pub fn new(runner: Arc<ExecRunner>, formatter: Arc<OutputFormatter>) -> Self {
        Self {
            surface: Surface::Any,
            runner,
            formatter,
        }
    }

    /// `python` or `shell`: kind fixed at registration.
    pub fn fixed(kind: ExecKind, runner: Arc<ExecRunner>, formatter: Arc<OutputFormatter>) -> Self {
        Self {
            surface: Surface::Fixed(kind),
            runner,
            formatter,
        }
    }

    fn parse(&self, input: Value) -> Result<(ExecKind, String, Option<u64>), ToolError> {
        match self.surface {
            Surface::Any => {
                let args: ExecArgs = parse_args(self.name(), input)?;
                Ok((args.kind, args.code, args.timeout))
            }
            Surface::Fixed(ExecKind::Python) => {
                let args: PythonArgs = parse_args(self.name(), input)?;
                Ok((ExecKind::Python, args.code, args.timeout))
            }
            Surface::Fixed(ExecKind::Shell) => {
                let args: ShellArgs = parse_args(self.name(), input)?;
                Ok((ExecKind::Shell, args.command, args.timeout))
            }
        }
    }
}

#[async_trait]
impl Tool for ExecTool {
    async fn execute(&self, input: Value) -> Result<ToolReport, ToolError> {
        let (kind, code, timeout) = self.parse(input)?;
        if code.trim().is_empty() {
            return Err(ToolError::invalid_arguments(self.name(), "code must not be empty"));
        }
        if timeout == Some(0) {
            return Err(ToolError::invalid_arguments(self.name(), "timeout must be at least 1 second"));
        }

        let result = self
            .runner
            .run(kind, &code, timeout.map(Duration::from_secs))
            .await?;
        Ok(self.formatter.format(kind, &code, &result))
    }

    fn name(&self) -> &str {
        match self.surface {
            Surface::Any => "exec",
            Surface::Fixed(ExecKind::Python) => "python",
            Surface::Fixed(ExecKind::Shell) => "shell",
        }
    }

    fn schema(&self) -> ToolSchemaInfo {
        let default_timeout = self.runner.default_timeout().as_secs();
        let timeout = json!({
            "type": "integer",
            "minimum": 1,
            "description": format!("Wall-clock limit in seconds (default {default_timeout})")
        });
        let (description, parameters) = match self.surface {
            Surface::Any => (
                "Run Python code or a shell command in the working directory. Output is truncated; oversized output is cached for the `cache` tool.",
                json!({
                    "type": "object",
                    "properties": {
                        "kind": { "type": "string", "enum": ["python", "shell"] },
                        "code": { "type": "string", "description": "Python source or shell command line" },
                        "timeout": timeout
                    },
                    "required": ["kind", "code"],
                    "additionalProperties": false
                }),
            ),
            Surface::Fixed(ExecKind::Python) => (
                "Run Python code in the working directory.",
                json!({
                    "type": "object",
                    "properties": {
                        "code": { "type": "string", "description": "Python source" },
                        "timeout": timeout
                    },
                    "required": ["code"],
                    "additionalProperties": false
                }),
            ),
            Surface::Fixed(ExecKind::Shell) => (
                "Run a shell command in the working directory.",
                json!({
                    "type": "object",
                    "properties": {
                        "command": { "type": "string", "description": "Shell command line" },
                        "timeout": timeout
                    },
                    "required": ["command"],
                    "additionalProperties": false
                }),
            ),
        };
        ToolSchemaInfo {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output_cache::OutputCache;
    use crate::output_format::OutputLimits;

    fn tool(surface: Option<ExecKind>) -> (ExecTool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ExecRunner::new(dir.path()).with_dry_run(true));
        let formatter = Arc::new(OutputFormatter::new(
            OutputLimits::default(),
            Arc::new(OutputCache::new()),
        ));
        let tool = match surface {
            None => ExecTool::new(runner, formatter),
            Some(kind) => ExecTool::fixed(kind, runner, formatter),
        };
        (tool, dir)
    }

    #[test]
    fn test_names_follow_surface() {
        assert_eq!(tool(None).0.name(), "exec");
        assert_eq!(tool(Some(ExecKind::Python)).0.name(), "python");
        assert_eq!(tool(Some(ExecKind::Shell)).0.name(), "shell");
        assert_eq!(tool(Some(ExecKind::Shell)).0.schema().parameters["required"][0], "command");
    }

    #[tokio::test]
    async fn test_dry_run_report() {
        let (tool, _dir) = tool(None);
        let report = tool
            .execute(json!({"kind": "shell", "code": "ls"}))
            .await
            .unwrap();
        assert!(report.model_text.starts_with("## Command Successful\n"));
        assert!(report.model_text.contains("[dry-run] shell not executed"));
    }

    #[tokio::test]
    async fn test_argument_shapes_are_strict() {
        let (shell, _dir) = tool(Some(ExecKind::Shell));
        let err = shell.execute(json!({"code": "ls"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let (exec, _dir) = tool(None);
        let err = exec
            .execute(json!({"kind": "ruby", "code": "puts 1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = exec
            .execute(json!({"kind": "shell", "code": "ls", "timeout": 0}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
