use std::sync::LazyLock;

use regex::Regex;

use super::{FileOp, FileOpKind, Hunk, HunkLine, PatchError};

static BEGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\*\*\*\s*begin\s+patch$").expect("valid regex"));
static END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\*\*\*\s*end\s+patch$").expect("valid regex"));
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\*\*\*\s*(add\s+file|delete\s+file|update\s+file|overwrite\s+file|move\s+to)\s*:\s*(.+)$")
        .expect("valid regex")
});
static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Add,
    Delete,
    Update,
    Overwrite,
    MoveTo,
}

/// Operations parsed from a document, in order. When `error` is set the
/// document was malformed at that point: `ops` holds everything before it.
#[derive(Debug, Default)]
pub struct ParsedPatch {
    pub ops: Vec<FileOp>,
    pub error: Option<PatchError>,
}

impl ParsedPatch {
    fn fail(ops: Vec<FileOp>, error: PatchError) -> Self {
        Self {
            ops,
            error: Some(error),
        }
    }
}

/// Drop a surrounding markdown code fence, if the whole document is wrapped in one.
pub fn strip_code_fence(patch: &str) -> &str {
    let text = patch.trim();
    if !text.starts_with("```") {
        return text;
    }
    let body = match FENCE_OPEN_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => return text,
    };
    body.strip_suffix("```").unwrap_or(body).trim_end()
}

fn is_begin(line: &str) -> bool {
    BEGIN_RE.is_match(line.trim())
}

fn is_end(line: &str) -> bool {
    END_RE.is_match(line.trim())
}

fn match_header(line: &str) -> Option<(Directive, String)> {
    let caps = HEADER_RE.captures(line.trim())?;
    let op: String = caps[1]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();
    let directive = match op.as_str() {
        "add file" => Directive::Add,
        "delete file" => Directive::Delete,
        "update file" => Directive::Update,
        "overwrite file" => Directive::Overwrite,
        "move to" => Directive::MoveTo,
        _ => return None,
    };
    Some((directive, caps[2].trim().to_string()))
}

fn is_boundary(line: &str) -> bool {
    is_end(line) || match_header(line).is_some()
}

/// Parse a patch document into file operations.
///
/// Never touches the file system. Headers and markers are matched
/// case-insensitively; a surrounding code fence is ignored.
pub fn parse_patch(patch: &str) -> ParsedPatch {
    let text = strip_code_fence(patch);
    let lines: Vec<&str> = text.lines().collect();
    let mut ops = Vec::new();

    match lines.first() {
        Some(first) if is_begin(first) => {}
        _ => {
            return ParsedPatch::fail(
                ops,
                PatchError::grammar(1, "Patch must start with '*** Begin Patch'."),
            )
        }
    }

    // `i` is a 0-based index; reported line numbers are 1-based.
    let mut i = 1;
    while i < lines.len() {
        let raw = lines[i];
        if is_end(raw) {
            return ParsedPatch { ops, error: None };
        }
        if raw.trim().is_empty() {
            i += 1;
            continue;
        }

        let start = i;
        let (directive, path) = match match_header(raw) {
            Some(h) => h,
            None => {
                return ParsedPatch::fail(
                    ops,
                    PatchError::grammar(i + 1, format!("Unrecognized patch directive: {raw}")),
                )
            }
        };
        i += 1;

        let kind = match directive {
            Directive::Add | Directive::Overwrite => {
                let label = if directive == Directive::Add {
                    "Add File"
                } else {
                    "Overwrite File"
                };
                let mut content = Vec::new();
                while i < lines.len() && !is_boundary(lines[i]) {
                    match lines[i].strip_prefix('+') {
                        Some(body) => content.push(body.to_string()),
                        None => {
                            return ParsedPatch::fail(
                                ops,
                                PatchError::grammar(
                                    i + 1,
                                    format!(
                                        "{label} '{path}' expects lines starting with '+'. Offending line: {}",
                                        lines[i]
                                    ),
                                ),
                            )
                        }
                    }
                    i += 1;
                }
                if directive == Directive::Add {
                    FileOpKind::Add { path, content }
                } else {
                    FileOpKind::Overwrite { path, content }
                }
            }
            Directive::Delete => FileOpKind::Delete { path },
            Directive::Update => {
                let mut move_to = None;
                if let Some((Directive::MoveTo, dest)) = lines.get(i).and_then(|l| match_header(l)) {
                    move_to = Some(dest);
                    i += 1;
                }
                match parse_hunks(&lines, &mut i, &path) {
                    Ok(hunks) => FileOpKind::Update {
                        path,
                        move_to,
                        hunks,
                    },
                    Err(err) => return ParsedPatch::fail(ops, err),
                }
            }
            Directive::MoveTo => {
                return ParsedPatch::fail(
                    ops,
                    PatchError::grammar(
                        start + 1,
                        "'*** Move to' must directly follow an '*** Update File' header.",
                    ),
                )
            }
        };

        ops.push(FileOp {
            kind,
            lines: start + 1..i + 1,
        });
    }

    ParsedPatch::fail(
        ops,
        PatchError::grammar(lines.len() + 1, "Patch must end with '*** End Patch'."),
    )
}

/// Collect hunks until the next header or end marker. Blank lines between
/// hunks are skipped; a blank line inside a hunk is an empty context line.
fn parse_hunks(lines: &[&str], i: &mut usize, path: &str) -> Result<Vec<Hunk>, PatchError> {
    let mut hunks = Vec::new();
    let mut current = Hunk::default();
    let mut pending_blank = 0usize;

    while *i < lines.len() && !is_boundary(lines[*i]) {
        let line = lines[*i];
        if let Some(rest) = line.strip_prefix("@@") {
            if !current.lines.is_empty() {
                hunks.push(std::mem::take(&mut current));
            }
            let locator = rest.trim();
            current.locator = (!locator.is_empty()).then(|| locator.to_string());
            pending_blank = 0;
        } else if line.trim().is_empty() {
            if !current.lines.is_empty() {
                pending_blank += 1;
            }
        } else {
            let tagged = match line.as_bytes()[0] {
                b' ' => HunkLine::Context(line[1..].to_string()),
                b'-' => HunkLine::Remove(line[1..].to_string()),
                b'+' => HunkLine::Add(line[1..].to_string()),
                _ => {
                    return Err(PatchError::grammar(
                        *i + 1,
                        format!(
                            "Update File '{path}' expects hunk lines starting with ' ', '-', '+' or '@@'. Offending line: {line}"
                        ),
                    ))
                }
            };
            for _ in 0..pending_blank {
                current.lines.push(HunkLine::Context(String::new()));
            }
            pending_blank = 0;
            current.lines.push(tagged);
        }
        *i += 1;
    }

    if !current.lines.is_empty() {
        hunks.push(current);
    }
    Ok(hunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_file() {
        let parsed = parse_patch("*** Begin Patch\n*** Add File: a.txt\n+hello\n*** End Patch");
        assert!(parsed.error.is_none());
        assert_eq!(parsed.ops.len(), 1);
        assert_eq!(
            parsed.ops[0].kind,
            FileOpKind::Add {
                path: "a.txt".into(),
                content: vec!["hello".into()],
            }
        );
        assert_eq!(parsed.ops[0].lines, 2..4);
    }

    #[test]
    fn test_markers_are_case_insensitive_and_fence_is_stripped() {
        let doc = "```diff\n*** begin patch\n***   delete file :  old.txt\n*** END PATCH\n```";
        let parsed = parse_patch(doc);
        assert!(parsed.error.is_none());
        assert_eq!(
            parsed.ops[0].kind,
            FileOpKind::Delete {
                path: "old.txt".into()
            }
        );
    }

    #[test]
    fn test_update_with_move_and_two_hunks() {
        let doc = "*** Begin Patch\n\
                   *** Update File: src/a.py\n\
                   *** Move to: src/b.py\n\
                   @@ def f():\n\
                   \x20    x = 1\n\
                   -    return x\n\
                   +    return x + 1\n\
                   \n\
                   @@\n\
                   -tail\n\
                   +TAIL\n\
                   *** End Patch";
        let parsed = parse_patch(doc);
        assert!(parsed.error.is_none(), "{:?}", parsed.error);
        match &parsed.ops[0].kind {
            FileOpKind::Update {
                path,
                move_to,
                hunks,
            } => {
                assert_eq!(path, "src/a.py");
                assert_eq!(move_to.as_deref(), Some("src/b.py"));
                assert_eq!(hunks.len(), 2);
                assert_eq!(hunks[0].locator.as_deref(), Some("def f():"));
                assert_eq!(hunks[0].before(), vec!["    x = 1", "    return x"]);
                assert_eq!(hunks[0].after(), vec!["    x = 1", "    return x + 1"]);
                assert_eq!(hunks[1].lines.len(), 2);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_inside_hunk_is_empty_context() {
        let doc = "*** Begin Patch\n*** Update File: a\n a\n\n-b\n+c\n\n*** End Patch";
        let parsed = parse_patch(doc);
        match &parsed.ops[0].kind {
            FileOpKind::Update { hunks, .. } => {
                assert_eq!(hunks.len(), 1);
                assert_eq!(hunks[0].before(), vec!["a", "", "b"]);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_missing_begin_marker() {
        let parsed = parse_patch("*** Add File: a.txt\n+x\n*** End Patch");
        assert!(parsed.ops.is_empty());
        assert!(matches!(parsed.error, Some(PatchError::Grammar { line: 1, .. })));
    }

    #[test]
    fn test_missing_end_marker_keeps_ops() {
        let parsed = parse_patch("*** Begin Patch\n*** Add File: a.txt\n+x");
        assert_eq!(parsed.ops.len(), 1);
        let err = parsed.error.unwrap();
        assert!(err.to_string().contains("Patch must end with '*** End Patch'."));
    }

    #[test]
    fn test_bad_prefix_in_add_stops_after_earlier_ops() {
        let doc = "*** Begin Patch\n*** Add File: a\n+ok\n*** Add File: b\nnot tagged\n*** End Patch";
        let parsed = parse_patch(doc);
        assert_eq!(parsed.ops.len(), 1);
        assert!(matches!(parsed.error, Some(PatchError::Grammar { line: 5, .. })));
    }

    #[test]
    fn test_stray_move_to_is_grammar_error() {
        let parsed = parse_patch("*** Begin Patch\n*** Move to: x\n*** End Patch");
        assert!(parsed.error.unwrap().is_grammar());
    }

    #[test]
    fn test_unrecognized_directive() {
        let parsed = parse_patch("*** Begin Patch\n*** Rename File: x\n*** End Patch");
        let err = parsed.error.unwrap();
        assert!(err.to_string().starts_with("Unrecognized patch directive"));
    }
}
