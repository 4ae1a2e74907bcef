use crate::cli::ExecutionMode;
use crate::config::Config;
use anyhow::{Context, Result};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Apply a patch document read from `file` (`-` for stdin).
pub async fn execute(
    file: PathBuf,
    model_view: bool,
    execution_mode: ExecutionMode,
    config: &Config,
    workspace: &Path,
) -> Result<bool> {
    let patch = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read patch from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&file).context(format!("Failed to read patch file: {:?}", file))?
    };

    let executor = super::build_executor(config, workspace, &execution_mode)?;
    let report = executor
        .execute("apply_patch", json!({ "patch": patch }))
        .await;
    Ok(super::print_report(&report, model_view))
}
