use harmony_runtime::markdown::{code_block, display_truncate, open_fence, truncate_chars};
use harmony_runtime::ToolReport;

use super::engine::{OpOutcome, OpReport, PatchRun};
use super::PatchOptions;

const HEADING_APPLIED: &str = "## ✅ Patch Applied\n";
const HEADING_WARNINGS: &str = "## ⚠️ Patch Applied With Warnings\n";
const HEADING_NO_CHANGES: &str = "## ⚠️ Patch Processed (no changes)\n";

fn section(report: &OpReport) -> String {
    let title = match &report.outcome {
        OpOutcome::Added => format!("### Added: `{}`", report.path),
        OpOutcome::Deleted => format!("### Deleted: `{}`", report.path),
        OpOutcome::Overwrote => format!("### Overwrote: `{}`", report.path),
        OpOutcome::Updated { moved_to: None } => format!("### Updated: `{}`", report.path),
        OpOutcome::Updated {
            moved_to: Some(dest),
        } => format!("### Updated: `{}` -> moved to `{dest}`", report.path),
        OpOutcome::Unchanged => format!("### Unchanged: `{}`", report.path),
    };
    let body = if report.diff.is_empty() {
        "(no visible diff)"
    } else {
        report.diff.text.as_str()
    };
    format!(
        "{title}\n- Lines added: **{}**, removed: **{}**, net: **{:+}**\n{}",
        report.diff.added,
        report.diff.removed,
        report.diff.net(),
        code_block(body, "diff")
    )
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut the model view at the character ceiling, closing a diff fence the
/// cut left open and noting what was kept.
fn clip_for_model(markdown: &str, max_chars: usize) -> String {
    let total = markdown.chars().count();
    if total <= max_chars {
        return markdown.to_string();
    }
    let kept = truncate_chars(markdown, max_chars);
    let mut out = kept.to_string();
    let lines: Vec<&str> = kept.lines().collect();
    if let Some(fence) = open_fence(&lines) {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&fence);
    }
    out.push_str(&format!(
        "\n_MODEL NOTE: Patch result truncated to protect context (kept first {max_chars} of {total} chars). Ask for specific files or smaller diffs if needed._\n"
    ));
    out
}

/// Render a patch run as the model/display report pair.
pub fn render_run(run: &PatchRun, options: &PatchOptions) -> ToolReport {
    let summaries: Vec<String> = run.applied().map(OpReport::summary).collect();
    let mut warnings: Vec<String> = run.warnings().cloned().collect();
    let failures: Vec<String> = run
        .failed
        .iter()
        .map(|f| format!("{} `{}`: {}", f.verb, f.path, f.error))
        .collect();

    let mut details: Vec<String> = run.applied().map(section).collect();
    if details.len() > options.max_sections {
        let hidden = details.len() - options.max_sections;
        details.truncate(options.max_sections);
        details.push(format!(
            "_NOTE: {hidden} additional file sections hidden to protect the context window. Ask for specific files if you need the rest._"
        ));
        warnings.push(format!(
            "Truncated {hidden} additional file section(s) to keep output manageable."
        ));
    }

    let mut md = String::new();
    if let Some(ref error) = run.aborted {
        md.push_str("## Error\n");
        md.push_str(&error.to_string());
        md.push('\n');
        if !summaries.is_empty() {
            md.push_str("\n### Applied before the error (not rolled back)\n");
            md.push_str(&bullet_list(&summaries));
            md.push('\n');
        }
    } else {
        let heading = if !warnings.is_empty() || !failures.is_empty() {
            HEADING_WARNINGS
        } else if summaries.is_empty() {
            HEADING_NO_CHANGES
        } else {
            HEADING_APPLIED
        };
        md.push_str(heading);
        if summaries.is_empty() {
            md.push_str("_(no changes)_\n");
        } else {
            md.push_str(&bullet_list(&summaries));
            md.push('\n');
        }
    }

    if !failures.is_empty() {
        md.push_str("\n### Failed\n");
        md.push_str(&bullet_list(&failures));
        md.push('\n');
    }
    if !warnings.is_empty() {
        md.push_str("\n### Warnings\n");
        md.push_str(&bullet_list(&warnings));
        md.push('\n');
    }
    if !details.is_empty() {
        md.push_str("\n---\n");
        md.push_str(&details.join("\n\n"));
    }

    ToolReport::new(
        clip_for_model(&md, options.model_max_chars),
        display_truncate(&md, options.display_max_lines),
    )
}
