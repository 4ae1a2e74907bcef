use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use harmony_runtime::{parse_args, Tool, ToolError, ToolReport, ToolSchemaInfo};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::patch::{render_run, PatchEngine};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ApplyPatchArgs {
    patch: String,
}

pub struct ApplyPatchTool {
    engine: Arc<PatchEngine>,
}

impl ApplyPatchTool {
    pub fn new(engine: Arc<PatchEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for ApplyPatchTool {
    async fn execute(&self, input: Value) -> Result<ToolReport, ToolError> {
        let args: ApplyPatchArgs = parse_args(self.name(), input)?;
        if args.patch.trim().is_empty() {
            return Err(ToolError::invalid_arguments(self.name(), "patch must not be empty"));
        }

        // File I/O is blocking; keep it off the runtime workers.
        let engine = Arc::clone(&self.engine);
        let report = tokio::task::spawn_blocking(move || {
            let run = engine.apply(&args.patch);
            render_run(&run, engine.options())
        })
        .await
        .context("patch worker did not complete")?;
        Ok(report)
    }

    fn name(&self) -> &str {
        "apply_patch"
    }

    fn schema(&self) -> ToolSchemaInfo {
        ToolSchemaInfo {
            name: "apply_patch".to_string(),
            description: "Add, delete, overwrite, update or rename files under the working directory. \
                The patch starts with `*** Begin Patch` and ends with `*** End Patch`; \
                operations are `*** Add File: <path>`, `*** Delete File: <path>`, \
                `*** Overwrite File: <path>` and `*** Update File: <path>` (optionally followed by \
                `*** Move to: <path>`). Update hunks start with `@@` and use ' ', '-' and '+' lines."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "patch": { "type": "string", "description": "Patch document" }
                },
                "required": ["patch"],
                "additionalProperties": false
            }),
        }
    }
}
