pub mod command_traits;
pub mod exec_runner;
pub mod output_cache;
pub mod output_format;
pub mod patch;
pub mod path_guard;
pub mod tools;

pub use command_traits::{analyze_command, CommandTraits, LineBudgets, NoiseTrait};
pub use exec_runner::{ExecKind, ExecRunner, ExecutionResult};
pub use output_cache::{CacheInfo, CacheSlice, OutputCache, ViewRequest, ViewUnit};
pub use output_format::{OutputFormatter, OutputLimits};
pub use patch::{PatchEngine, PatchError, PatchOptions};
pub use path_guard::{GuardedPath, PathGuard, PathSafetyError};
pub use tools::{ApplyPatchTool, CacheTool, ExecTool};

use std::sync::Arc;

use harmony_runtime::{ToolError, ToolExecutor};

/// Register `exec`, `python` and `shell`, all sharing one runner and formatter.
pub fn register_exec_tools(
    executor: &ToolExecutor,
    runner: Arc<ExecRunner>,
    formatter: Arc<OutputFormatter>,
) -> Result<(), ToolError> {
    executor.register_tool(Arc::new(ExecTool::new(runner.clone(), formatter.clone())))?;
    executor.register_tool(Arc::new(ExecTool::fixed(
        ExecKind::Python,
        runner.clone(),
        formatter.clone(),
    )))?;
    executor.register_tool(Arc::new(ExecTool::fixed(ExecKind::Shell, runner, formatter)))?;
    Ok(())
}

pub fn register_patch_tool(executor: &ToolExecutor, engine: Arc<PatchEngine>) -> Result<(), ToolError> {
    executor.register_tool(Arc::new(ApplyPatchTool::new(engine)))
}

pub fn register_cache_tool(
    executor: &ToolExecutor,
    cache: Arc<OutputCache>,
    preview_lines: usize,
) -> Result<(), ToolError> {
    executor.register_tool(Arc::new(
        CacheTool::new(cache).with_preview_lines(preview_lines),
    ))
}
