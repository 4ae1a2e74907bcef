//! `Tool` implementations exposed to the model.

pub mod apply_patch;
pub mod cache;
pub mod exec;

pub use apply_patch::ApplyPatchTool;
pub use cache::CacheTool;
pub use exec::ExecTool;
