use similar::{ChangeTag, TextDiff};

/// Unified diff of one file plus its line accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Diff text, capped at the configured line count.
    pub text: String,
    /// `+` body lines in the full diff.
    pub added: usize,
    /// `-` body lines in the full diff.
    pub removed: usize,
    /// Diff lines dropped by the cap.
    pub hidden_lines: usize,
}

impl FileDiff {
    pub fn net(&self) -> i64 {
        self.added as i64 - self.removed as i64
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// "(+A/-R, net ±N)"
    pub fn stats(&self) -> String {
        format!("(+{}/-{}, net {:+})", self.added, self.removed, self.net())
    }
}

/// Unified diff between two line sequences, three lines of context.
///
/// Counts come from change tags over the whole diff, so they hold even when
/// the text is cut at `max_lines`.
pub fn unified_diff(
    old: &[String],
    new: &[String],
    from_name: &str,
    to_name: &str,
    max_lines: usize,
) -> FileDiff {
    let old_refs: Vec<&str> = old.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new.iter().map(String::as_str).collect();
    let diff = TextDiff::from_slices(&old_refs, &new_refs);

    let mut emitted: Vec<String> = Vec::new();
    let mut added = 0;
    let mut removed = 0;

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        if emitted.is_empty() {
            emitted.push(format!("--- {from_name}"));
            emitted.push(format!("+++ {to_name}"));
        }
        emitted.push(hunk.header().to_string().trim_end().to_string());
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Insert => {
                    added += 1;
                    '+'
                }
                ChangeTag::Delete => {
                    removed += 1;
                    '-'
                }
                ChangeTag::Equal => ' ',
            };
            emitted.push(format!("{sign}{}", change.value()));
        }
    }

    let hidden_lines = emitted.len().saturating_sub(max_lines);
    if hidden_lines > 0 {
        emitted.truncate(max_lines);
        emitted.push(format!("... ({hidden_lines} diff lines hidden) ..."));
    }

    FileDiff {
        text: emitted.join("\n"),
        added,
        removed,
        hidden_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &[&str]) -> Vec<String> {
        s.iter().map(|l| l.to_string()).collect()
    }

    fn body_count(text: &str, sign: char) -> usize {
        text.lines()
            .filter(|l| !l.starts_with("+++ ") && !l.starts_with("--- "))
            .filter(|l| l.starts_with(sign))
            .count()
    }

    #[test]
    fn test_new_file_against_dev_null() {
        let d = unified_diff(&[], &lines(&["hello"]), "/dev/null", "a.txt", 300);
        assert_eq!(d.text, "--- /dev/null\n+++ a.txt\n@@ -0,0 +1 @@\n+hello");
        assert_eq!((d.added, d.removed), (1, 0));
        assert_eq!(d.stats(), "(+1/-0, net +1)");
    }

    #[test]
    fn test_counts_match_emitted_body_lines() {
        let old = lines(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let new = lines(&["a", "B", "c", "d", "e", "f", "g", "h", "++i", "j", "k"]);
        let d = unified_diff(&old, &new, "x", "x", 300);
        assert_eq!(d.added, body_count(&d.text, '+'));
        assert_eq!(d.removed, body_count(&d.text, '-'));
        assert_eq!(d.net(), 1);
    }

    #[test]
    fn test_identical_inputs_give_empty_diff() {
        let same = lines(&["a", "b"]);
        let d = unified_diff(&same, &same, "x", "x", 300);
        assert!(d.is_empty());
        assert_eq!(d.stats(), "(+0/-0, net +0)");
    }

    #[test]
    fn test_truncation_keeps_full_counts() {
        let new: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
        let d = unified_diff(&[], &new, "/dev/null", "big.txt", 10);
        assert_eq!(d.added, 50);
        assert_eq!(d.hidden_lines, 53 - 10);
        assert_eq!(d.text.lines().count(), 11);
        assert!(d.text.ends_with("... (43 diff lines hidden) ..."));
    }
}
