use std::sync::Arc;

use harmony_runtime::markdown::{code_block, display_truncate, truncate_chars, truncate_lines};
use harmony_runtime::ToolReport;

use crate::command_traits::{analyze_command, CommandTraits, LineBudgets};
use crate::exec_runner::{ExecKind, ExecutionResult};
use crate::output_cache::OutputCache;

/// Size limits of both renderings, read from `[output]` in the config.
#[derive(Debug, Clone)]
pub struct OutputLimits {
    /// Hard ceiling on the model view, in characters.
    pub model_max_chars: usize,
    pub model_lines: LineBudgets,
    pub model_max_line_length: usize,
    /// On-screen line cap of the whole display view.
    pub display_max_lines: usize,
    /// Per-stream line cap inside the display view.
    pub display_stream_lines: usize,
    pub display_max_line_length: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            model_max_chars: 25_000,
            model_lines: LineBudgets::default(),
            model_max_line_length: 400,
            display_max_lines: harmony_runtime::markdown::DISPLAY_MAX_LINES,
            display_stream_lines: 25,
            display_max_line_length: 1000,
        }
    }
}

/// A stream whose full text went to the cache.
struct CachedStream {
    label: &'static str,
    id: String,
    lines: usize,
}

impl CachedStream {
    fn note(&self) -> String {
        format!(
            "_Full {} ({} lines) cached as `{}`. Use the `cache` tool to view more._\n",
            self.label, self.lines, self.id
        )
    }
}

/// Turns an `ExecutionResult` into the model/display report pair, caching
/// any stream the model view could not show in full.
pub struct OutputFormatter {
    limits: OutputLimits,
    cache: Arc<OutputCache>,
}

impl OutputFormatter {
    pub fn new(limits: OutputLimits, cache: Arc<OutputCache>) -> Self {
        Self { limits, cache }
    }

    pub fn limits(&self) -> &OutputLimits {
        &self.limits
    }

    pub fn format(&self, kind: ExecKind, code: &str, result: &ExecutionResult) -> ToolReport {
        let traits = match kind {
            ExecKind::Shell => analyze_command(code),
            ExecKind::Python => CommandTraits::default(),
        };
        let header = if result.success() {
            "## Command Successful\n".to_string()
        } else {
            format!("## Command FAILED (Exit Code: {})\n", result.exit_code)
        };
        let stdout = result.stdout.trim_end_matches('\n');
        let stderr = result.stderr.trim_end_matches('\n');

        let model_text = self.model_view(&header, kind, &traits, stdout, stderr);
        let display_text = self.display_view(&header, kind, &traits, stdout, stderr);
        ToolReport::new(model_text, display_text)
    }

    fn model_view(
        &self,
        header: &str,
        kind: ExecKind,
        traits: &CommandTraits,
        stdout: &str,
        stderr: &str,
    ) -> String {
        let limits = &self.limits;
        let omission = |n: usize| format!("... (output truncated, {n} more lines hidden) ...");

        let out = truncate_lines(
            stdout,
            traits.line_budget(&limits.model_lines),
            limits.model_max_line_length,
            omission,
        );
        let err = truncate_lines(
            stderr,
            limits.model_lines.default,
            limits.model_max_line_length,
            omission,
        );

        let mut cached = Vec::new();
        let mut out_cached = false;
        let mut err_cached = false;
        if out.is_truncated() {
            cached.push(self.cache_stream("stdout", stdout));
            out_cached = true;
        }
        if err.is_truncated() {
            cached.push(self.cache_stream("stderr", stderr));
            err_cached = true;
        }

        let mut md = String::from(header);
        if !out.text.is_empty() {
            md.push_str("### STDOUT\n");
            md.push_str(&code_block(&out.text, kind.lexer()));
        }
        if !err.text.is_empty() {
            md.push_str("### STDERR\n");
            md.push_str(&code_block(&err.text, "text"));
        }
        if out.text.is_empty() && err.text.is_empty() {
            md.push_str("The command produced no output.\n");
        }

        let total = md.chars().count();
        if total > limits.model_max_chars {
            // Everything not already cached goes in now so nothing is lost.
            if !out_cached && !stdout.is_empty() {
                cached.push(self.cache_stream("stdout", stdout));
            }
            if !err_cached && !stderr.is_empty() {
                cached.push(self.cache_stream("stderr", stderr));
            }

            let combined = join_streams(&out.text, &err.text);
            let raw_total = join_streams(stdout, stderr).chars().count();
            let kept = truncate_chars(&combined, limits.model_max_chars);
            md = format!(
                "{header}### OUTPUT (combined)\n{}_MODEL NOTE: Result automatically truncated to protect the context window (kept first {} of {raw_total} chars). Consider narrowing the command or asking for specific ranges._\n",
                code_block(kept, "text"),
                kept.chars().count(),
            );
        }

        for stream in &cached {
            md.push_str(&stream.note());
        }
        md
    }

    fn display_view(
        &self,
        header: &str,
        kind: ExecKind,
        traits: &CommandTraits,
        stdout: &str,
        stderr: &str,
    ) -> String {
        let limits = &self.limits;
        let omission = |n: usize| format!(". {n} lines hidden .");

        let mut md = String::from(header);
        if !stdout.is_empty() {
            let shown = truncate_lines(
                stdout,
                limits.display_stream_lines,
                limits.display_max_line_length,
                omission,
            );
            md.push_str("### STDOUT\n");
            md.push_str(&code_block(&shown.text, kind.lexer()));
        }
        if !stderr.is_empty() {
            let shown = truncate_lines(
                stderr,
                limits.display_stream_lines,
                limits.display_max_line_length,
                omission,
            );
            md.push_str("### STDERR\n");
            md.push_str(&code_block(&shown.text, "text"));
        }
        if stdout.is_empty() && stderr.is_empty() {
            md.push_str("The command produced no output.\n");
        }
        for note in traits.display_notes() {
            md.push_str(&format!("_{note}_\n"));
        }
        display_truncate(&md, limits.display_max_lines)
    }

    fn cache_stream(&self, label: &'static str, text: &str) -> CachedStream {
        let id = self.cache.insert(text);
        CachedStream {
            label,
            id,
            lines: text.lines().count(),
        }
    }
}

/// Single payload of both streams, stderr tagged after a blank line.
fn join_streams(stdout: &str, stderr: &str) -> String {
    let mut joined = stdout.to_string();
    if !stderr.is_empty() {
        if !joined.is_empty() {
            joined.push_str("\n\n");
        }
        joined.push_str("[stderr]\n");
        joined.push_str(stderr);
    }
    joined
}
