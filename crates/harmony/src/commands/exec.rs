use crate::cli::{ExecutionMode, KindArg};
use crate::config::Config;
use anyhow::Result;
use harmony_adapters::ExecKind;
use serde_json::json;
use std::path::Path;

/// Run one piece of code through the `exec` tool and print its report.
pub async fn execute(
    kind: KindArg,
    code: String,
    timeout: Option<u64>,
    model_view: bool,
    execution_mode: ExecutionMode,
    config: &Config,
    workspace: &Path,
) -> Result<bool> {
    let executor = super::build_executor(config, workspace, &execution_mode)?;

    let kind = ExecKind::from(kind);
    let mut input = json!({ "kind": kind, "code": code });
    if let Some(secs) = timeout {
        input["timeout"] = json!(secs);
    }

    let report = executor.execute("exec", input).await;
    Ok(super::print_report(&report, model_view))
}
