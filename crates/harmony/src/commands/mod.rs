pub mod chat;
pub mod exec;
pub mod init;
pub mod patch;

use crate::cli::ExecutionMode;
use crate::config::Config;
use anyhow::{Context, Result};
use harmony_adapters::{
    register_cache_tool, register_exec_tools, register_patch_tool, ExecRunner, OutputCache,
    OutputFormatter, PatchEngine, PathGuard,
};
use harmony_runtime::{ToolExecutor, ToolReport};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the dispatch table with every tool sharing one working root and one cache.
pub fn build_executor(
    config: &Config,
    workspace: &Path,
    execution_mode: &ExecutionMode,
) -> Result<Arc<ToolExecutor>> {
    let guard = PathGuard::new(workspace)
        .context(format!("Workspace not accessible: {:?}", workspace))?;
    let root = guard.root().to_path_buf();
    let dry_run = execution_mode.dry_run(config.exec.dry_run);

    let cache = Arc::new(OutputCache::new());
    let runner = Arc::new(
        ExecRunner::new(&root)
            .with_python_bin(&config.exec.python_bin)
            .with_timeout(Duration::from_secs(config.exec.timeout_secs))
            .with_dry_run(dry_run),
    );
    let formatter = Arc::new(OutputFormatter::new(config.output.limits(), cache.clone()));
    let engine = Arc::new(PatchEngine::new(guard, config.patch_options()));

    let executor = ToolExecutor::new();
    register_exec_tools(&executor, runner, formatter)?;
    register_patch_tool(&executor, engine)?;
    register_cache_tool(&executor, cache, config.output.cache_preview_lines)?;

    info!(root = %root.display(), dry_run, tools = ?executor.tool_names(), "Tools registered");
    Ok(Arc::new(executor))
}

/// Print one view of a report; the exit status reflects the error envelope.
pub fn print_report(report: &ToolReport, model_view: bool) -> bool {
    let text = if model_view {
        &report.model_text
    } else {
        &report.display_text
    };
    println!("{}", text.trim_end());
    !report.is_error()
}
