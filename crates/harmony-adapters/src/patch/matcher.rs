use super::Hunk;

/// What happened to one hunk of an `Update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkOutcome {
    /// `before` was found at `start` (0-based, in the buffer as it stood when
    /// this hunk ran) and replaced by `after`.
    Applied {
        start: usize,
        removed: usize,
        added: usize,
        /// Matched only after trimming trailing whitespace.
        relaxed: bool,
    },
    /// `before` was not found; the buffer is unchanged.
    Skipped { before_len: usize },
}

impl HunkOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// First index where `needle` occurs as a contiguous run of `hay`.
fn find_window<F>(hay: &[String], needle: &[&str], eq: F) -> Option<usize>
where
    F: Fn(&str, &str) -> bool,
{
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len())
        .find(|&s| needle.iter().zip(&hay[s..]).all(|(n, h)| eq(h.as_str(), *n)))
}

/// Locate `before` in `lines`, exactly first, then ignoring trailing whitespace.
pub fn locate(lines: &[String], before: &[&str]) -> Option<(usize, bool)> {
    if let Some(pos) = find_window(lines, before, |a, b| a == b) {
        return Some((pos, false));
    }
    find_window(lines, before, |a, b| a.trim_end() == b.trim_end()).map(|pos| (pos, true))
}

/// Apply `hunks` in order, each against the buffer the previous one produced.
///
/// The input is never mutated. A hunk with no context and no removals
/// appends its lines at the end of the file.
pub fn apply_hunks(old_lines: &[String], hunks: &[Hunk]) -> (Vec<String>, Vec<HunkOutcome>) {
    let mut buffer = old_lines.to_vec();
    let mut outcomes = Vec::with_capacity(hunks.len());

    for hunk in hunks {
        let before = hunk.before();
        let after: Vec<String> = hunk.after().into_iter().map(String::from).collect();

        let found = if before.is_empty() {
            Some((buffer.len(), false))
        } else {
            locate(&buffer, &before)
        };

        match found {
            Some((start, relaxed)) => {
                let removed = before.len();
                let added = after.len();
                buffer.splice(start..start + removed, after);
                outcomes.push(HunkOutcome::Applied {
                    start,
                    removed,
                    added,
                    relaxed,
                });
            }
            None => outcomes.push(HunkOutcome::Skipped {
                before_len: before.len(),
            }),
        }
    }

    (buffer, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::HunkLine;

    fn lines(s: &[&str]) -> Vec<String> {
        s.iter().map(|l| l.to_string()).collect()
    }

    fn hunk(body: &[(char, &str)]) -> Hunk {
        Hunk {
            locator: None,
            lines: body
                .iter()
                .map(|(tag, text)| match tag {
                    ' ' => HunkLine::Context(text.to_string()),
                    '-' => HunkLine::Remove(text.to_string()),
                    _ => HunkLine::Add(text.to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_exact_match_replaces_window() {
        let old = lines(&["a", "b", "c"]);
        let h = hunk(&[(' ', "a"), ('-', "b"), ('+', "B"), (' ', "c")]);
        let (new, outcomes) = apply_hunks(&old, &[h]);
        assert_eq!(new, lines(&["a", "B", "c"]));
        assert_eq!(
            outcomes,
            vec![HunkOutcome::Applied {
                start: 0,
                removed: 3,
                added: 3,
                relaxed: false
            }]
        );
        assert_eq!(old, lines(&["a", "b", "c"]));
    }

    #[test]
    fn test_relaxed_match_on_trailing_whitespace() {
        let old = lines(&["fn x() {  ", "    1", "}"]);
        let h = hunk(&[(' ', "fn x() {"), ('-', "    1"), ('+', "    2")]);
        let (new, outcomes) = apply_hunks(&old, &[h]);
        assert_eq!(new, lines(&["fn x() {", "    2", "}"]));
        assert!(matches!(outcomes[0], HunkOutcome::Applied { relaxed: true, .. }));
    }

    #[test]
    fn test_later_hunk_sees_patched_buffer() {
        let old = lines(&["one", "two"]);
        let first = hunk(&[('-', "one"), ('+', "uno")]);
        let second = hunk(&[(' ', "uno"), ('+', "dos")]);
        let (new, outcomes) = apply_hunks(&old, &[first, second]);
        assert_eq!(new, lines(&["uno", "dos", "two"]));
        assert!(outcomes.iter().all(HunkOutcome::is_applied));
    }

    #[test]
    fn test_missing_context_skips_only_that_hunk() {
        let old = lines(&["a", "b"]);
        let missing = hunk(&[(' ', "zzz"), ('+', "never")]);
        let ok = hunk(&[('-', "b"), ('+', "c")]);
        let (new, outcomes) = apply_hunks(&old, &[missing, ok]);
        assert_eq!(new, lines(&["a", "c"]));
        assert_eq!(outcomes[0], HunkOutcome::Skipped { before_len: 1 });
        assert!(outcomes[1].is_applied());
    }

    #[test]
    fn test_pure_addition_appends() {
        let old = lines(&["a"]);
        let (new, _) = apply_hunks(&old, &[hunk(&[('+', "b")])]);
        assert_eq!(new, lines(&["a", "b"]));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let old = lines(&["x", "y", "x"]);
        let (new, outcomes) = apply_hunks(&old, &[hunk(&[('-', "x"), ('+', "z")])]);
        assert_eq!(new, lines(&["z", "y", "x"]));
        assert!(matches!(outcomes[0], HunkOutcome::Applied { start: 0, .. }));
    }
}
