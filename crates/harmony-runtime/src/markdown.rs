//! Markdown helpers shared by every tool renderer.
//!
//! All cuts are made on `char` boundaries, and any code fence left open by a
//! cut is closed with a fence of the same length.

/// Default on-screen line budget for display views.
pub const DISPLAY_MAX_LINES: usize = 25;

const MIN_FENCE: usize = 3;

/// Map a loose language hint onto the handful of lexers the renderer knows.
pub fn normalize_lexer(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "python" | "py" => "python",
        "bash" | "sh" | "shell" => "bash",
        "diff" | "patch" => "diff",
        "json" => "json",
        _ => "text",
    }
}

/// Wrap `body` in a fenced block whose fence is longer than any backtick run
/// inside it, so the body can never terminate the block early.
pub fn code_block(body: &str, language: &str) -> String {
    let longest_run = longest_backtick_run(body);
    let fence = "`".repeat(MIN_FENCE.max(longest_run + 1));
    let lexer = normalize_lexer(language);
    let mut out = String::with_capacity(body.len() + fence.len() * 2 + 16);
    out.push_str(&fence);
    out.push_str(lexer);
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out.push('\n');
    out
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Result of a line/width-bounded truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    /// Lines dropped from the end.
    pub hidden_lines: usize,
    /// Kept lines whose tail was clipped.
    pub clipped_lines: usize,
}

impl Truncated {
    pub fn is_truncated(&self) -> bool {
        self.hidden_lines > 0 || self.clipped_lines > 0
    }
}

/// Keep the first `max_lines` lines, clip each to `max_line_length` chars and
/// append `omission(hidden)` when lines were dropped.
pub fn truncate_lines(
    output: &str,
    max_lines: usize,
    max_line_length: usize,
    omission: impl Fn(usize) -> String,
) -> Truncated {
    let lines: Vec<&str> = output.lines().collect();
    let hidden_lines = lines.len().saturating_sub(max_lines);
    let mut clipped_lines = 0;

    let mut kept: Vec<String> = Vec::with_capacity(lines.len().min(max_lines));
    for line in lines.iter().take(max_lines) {
        let head = truncate_chars(line, max_line_length);
        if head.len() < line.len() {
            clipped_lines += 1;
            kept.push(format!("{head} ... (line truncated) ..."));
        } else {
            kept.push((*line).to_string());
        }
    }

    let mut text = kept.join("\n");
    if hidden_lines > 0 {
        text.push('\n');
        text.push_str(&omission(hidden_lines));
    }

    Truncated {
        text,
        hidden_lines,
        clipped_lines,
    }
}

/// Trim markdown to `max_lines` raw lines for the console, closing a fence
/// the cut left open and noting how many lines were hidden.
pub fn display_truncate(markdown: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    if lines.len() <= max_lines {
        return markdown.to_string();
    }

    let kept = &lines[..max_lines];
    let mut out = kept.join("\n");
    if let Some(fence) = open_fence(kept) {
        out.push('\n');
        out.push_str(&fence);
    }
    let hidden = lines.len() - max_lines;
    out.push_str(&format!("\n\n... {hidden} lines hidden ...\n"));
    out
}

/// The fence still open at the end of `lines`, if any.
pub fn open_fence(lines: &[&str]) -> Option<String> {
    let mut open: Option<usize> = None;
    for line in lines {
        let trimmed = line.trim();
        let ticks = trimmed.chars().take_while(|c| *c == '`').count();
        if ticks < MIN_FENCE {
            continue;
        }
        match open {
            None => open = Some(ticks),
            Some(len) if ticks >= len && trimmed[ticks..].trim().is_empty() => open = None,
            Some(_) => {}
        }
    }
    open.map(|len| "`".repeat(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_block_grows_fence_past_inner_backticks() {
        let block = code_block("before\n````\nafter", "sh");
        assert!(block.starts_with("`````bash\n"));
        assert!(block.ends_with("\n`````\n"));
    }

    #[test]
    fn test_normalize_lexer_falls_back_to_text() {
        assert_eq!(normalize_lexer("Shell"), "bash");
        assert_eq!(normalize_lexer("rust"), "text");
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("日本語", 5), "日本語");
    }

    #[test]
    fn test_truncate_lines_counts_hidden_and_clipped() {
        let input = "aaaa\nb\nc\nd";
        let out = truncate_lines(input, 2, 2, |n| format!("[{n} hidden]"));
        assert_eq!(out.text, "aa ... (line truncated) ...\nb\n[2 hidden]");
        assert_eq!(out.hidden_lines, 2);
        assert_eq!(out.clipped_lines, 1);
        assert!(out.is_truncated());
    }

    #[test]
    fn test_truncate_lines_untouched_when_within_budget() {
        let out = truncate_lines("x\ny", 5, 10, |n| n.to_string());
        assert_eq!(out.text, "x\ny");
        assert!(!out.is_truncated());
    }

    #[test]
    fn test_display_truncate_closes_open_fence() {
        let md = "## Title\n````text\n1\n2\n3\n4\n````\n";
        let out = display_truncate(md, 4);
        assert_eq!(out, "## Title\n````text\n1\n2\n````\n\n... 3 lines hidden ...\n");
    }

    #[test]
    fn test_display_truncate_leaves_closed_fence_alone() {
        let md = "```text\na\n```\nb\nc\nd";
        let out = display_truncate(md, 4);
        assert_eq!(out, "```text\na\n```\nb\n\n... 2 lines hidden ...\n");
    }

    #[test]
    fn test_open_fence_matches_opening_length() {
        assert_eq!(open_fence(&["## T", "````diff", "+a"]), Some("````".into()));
        assert_eq!(open_fence(&["```text", "a", "```"]), None);
        assert_eq!(open_fence(&["no fences here"]), None);
    }

    #[test]
    fn test_display_truncate_short_input_unchanged() {
        assert_eq!(display_truncate("one\ntwo\n", 5), "one\ntwo\n");
    }
}
