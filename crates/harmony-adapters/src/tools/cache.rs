use std::sync::Arc;

use async_trait::async_trait;
use harmony_runtime::markdown::{code_block, DISPLAY_MAX_LINES};
use harmony_runtime::{parse_args, Tool, ToolError, ToolReport, ToolSchemaInfo};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::output_cache::{
    CacheSlice, OutputCache, ViewRequest, ViewUnit, DEFAULT_PREVIEW_LINES, DEFAULT_VIEW_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CacheAction {
    View,
    Info,
    Drop,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheArgs {
    action: CacheAction,
    id: String,
    #[serde(default)]
    mode: Option<ViewUnit>,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    before: Option<usize>,
    #[serde(default)]
    after: Option<usize>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    page_size: Option<usize>,
}

impl CacheArgs {
    fn view_request(&self) -> Result<ViewRequest, ToolError> {
        let mode = self.mode.unwrap_or(ViewUnit::Lines);
        let paged = self.page.is_some() || self.page_size.is_some();
        match mode {
            ViewUnit::Lines if paged => {
                if self.start.is_some() {
                    return Err(ToolError::invalid_arguments(
                        "cache",
                        "use either `start` or `page`, not both",
                    ));
                }
                Ok(ViewRequest::Page {
                    page: self.page.unwrap_or(1),
                    page_size: self.page_size.unwrap_or(DEFAULT_VIEW_COUNT),
                })
            }
            ViewUnit::Lines => Ok(ViewRequest::Lines {
                start: self.start.unwrap_or(0),
                count: self.count.unwrap_or(DEFAULT_VIEW_COUNT),
                before: self.before.unwrap_or(0),
                after: self.after.unwrap_or(0),
            }),
            ViewUnit::Chars => {
                if paged || self.before.is_some() || self.after.is_some() {
                    return Err(ToolError::invalid_arguments(
                        "cache",
                        "`chars` mode takes only `start` and `count`",
                    ));
                }
                Ok(ViewRequest::Chars {
                    start: self.start.unwrap_or(0),
                    count: self.count.unwrap_or(DEFAULT_VIEW_COUNT),
                })
            }
        }
    }
}

/// Serves windows of cached oversized output.
pub struct CacheTool {
    cache: Arc<OutputCache>,
    preview_lines: usize,
}

impl CacheTool {
    pub fn new(cache: Arc<OutputCache>) -> Self {
        Self {
            cache,
            preview_lines: DEFAULT_PREVIEW_LINES,
        }
    }

    pub fn with_preview_lines(mut self, preview_lines: usize) -> Self {
        self.preview_lines = preview_lines;
        self
    }
}

fn render_slice(id: &str, slice: &CacheSlice) -> String {
    let unit = match slice.unit {
        ViewUnit::Lines => "lines",
        ViewUnit::Chars => "chars",
    };
    let range = if slice.is_empty() {
        "nothing".to_string()
    } else {
        format!("{unit} {}-{}", slice.first, slice.last - 1)
    };
    let mut md = format!(
        "## Cache `{id}`\nShowing {range} of {} {unit} (total={}).\n",
        slice.total, slice.total
    );
    md.push_str(&code_block(&slice.text, "text"));
    if slice.last < slice.total {
        md.push_str(&format!(
            "_{} more {unit} after this window._\n",
            slice.total - slice.last
        ));
    }
    md
}

#[async_trait]
impl Tool for CacheTool {
    async fn execute(&self, input: Value) -> Result<ToolReport, ToolError> {
        let args: CacheArgs = parse_args(self.name(), input)?;
        let markdown = match args.action {
            CacheAction::View => {
                let slice = self.cache.view(&args.id, args.view_request()?)?;
                render_slice(&args.id, &slice)
            }
            CacheAction::Info => {
                let info = self.cache.info(&args.id, self.preview_lines)?;
                format!(
                    "## Cache `{}`\n- Lines: **{}**\n- Characters: **{}**\n### Preview\n{}",
                    info.id,
                    info.total_lines,
                    info.total_chars,
                    code_block(&info.preview, "text")
                )
            }
            CacheAction::Drop => {
                self.cache.remove(&args.id)?;
                format!("## Cache `{}` dropped\n", args.id)
            }
        };
        Ok(ToolReport::from_markdown(markdown, DISPLAY_MAX_LINES))
    }

    fn name(&self) -> &str {
        "cache"
    }

    fn schema(&self) -> ToolSchemaInfo {
        ToolSchemaInfo {
            name: "cache".to_string(),
            description: "View, inspect or drop cached command output. Lines and chars are 0-based; pages are 1-based.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["view", "info", "drop"] },
                    "id": { "type": "string", "description": "Cache id from a truncated result" },
                    "mode": { "type": "string", "enum": ["lines", "chars"], "default": "lines" },
                    "start": { "type": "integer", "minimum": 0, "default": 0 },
                    "count": { "type": "integer", "minimum": 0, "default": DEFAULT_VIEW_COUNT },
                    "before": { "type": "integer", "minimum": 0, "description": "Extra context lines before `start`" },
                    "after": { "type": "integer", "minimum": 0, "description": "Extra context lines after the window" },
                    "page": { "type": "integer", "minimum": 1 },
                    "page_size": { "type": "integer", "minimum": 1, "default": DEFAULT_VIEW_COUNT }
                },
                "required": ["action", "id"],
                "additionalProperties": false
            }),
        }
    }
}
