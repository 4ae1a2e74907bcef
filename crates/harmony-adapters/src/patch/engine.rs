use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{info, warn};

use super::diff::{unified_diff, FileDiff};
use super::matcher::{apply_hunks, HunkOutcome};
use super::parser::parse_patch;
use super::{FileOp, FileOpKind, Hunk, PatchError, PatchOptions};
use crate::path_guard::{GuardedPath, PathGuard};

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutcome {
    Added,
    Deleted,
    Overwrote,
    Updated { moved_to: Option<String> },
    /// An `Update` in which nothing applied; the file was left alone.
    Unchanged,
}

/// Result of one operation that ran to completion.
#[derive(Debug, Clone)]
pub struct OpReport {
    pub path: String,
    pub outcome: OpOutcome,
    pub diff: FileDiff,
    pub warnings: Vec<String>,
}

impl OpReport {
    pub fn changed_files(&self) -> bool {
        self.outcome != OpOutcome::Unchanged
    }

    /// "Added a.txt (+1/-0, net +1)"
    pub fn summary(&self) -> String {
        let verb = match &self.outcome {
            OpOutcome::Added => "Added",
            OpOutcome::Deleted => "Deleted",
            OpOutcome::Overwrote => "Overwrote",
            OpOutcome::Updated { .. } => "Updated",
            OpOutcome::Unchanged => "Left unchanged",
        };
        match &self.outcome {
            OpOutcome::Updated {
                moved_to: Some(dest),
            } => format!("{verb} {} -> {dest} {}", self.path, self.diff.stats()),
            _ => format!("{verb} {} {}", self.path, self.diff.stats()),
        }
    }
}

/// An operation that was refused or failed part way.
#[derive(Debug)]
pub struct FailedOp {
    pub verb: &'static str,
    pub path: String,
    pub error: PatchError,
}

/// Everything that happened while applying one patch document.
#[derive(Debug, Default)]
pub struct PatchRun {
    pub reports: Vec<OpReport>,
    pub failed: Vec<FailedOp>,
    /// Grammar error that stopped processing. Earlier operations stay applied.
    pub aborted: Option<PatchError>,
}

impl PatchRun {
    pub fn applied(&self) -> impl Iterator<Item = &OpReport> {
        self.reports.iter().filter(|r| r.changed_files())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &String> {
        self.reports.iter().flat_map(|r| r.warnings.iter())
    }
}

/// Applies patch documents to files under one working root.
///
/// Operations run in document order with no rollback: a failed operation
/// leaves earlier ones in place.
pub struct PatchEngine {
    guard: PathGuard,
    options: PatchOptions,
}

impl PatchEngine {
    pub fn new(guard: PathGuard, options: PatchOptions) -> Self {
        Self { guard, options }
    }

    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    /// Parse and apply a whole document.
    pub fn apply(&self, patch: &str) -> PatchRun {
        let parsed = parse_patch(patch);
        let mut run = PatchRun::default();

        for op in &parsed.ops {
            match self.apply_op(op) {
                Ok(report) => {
                    info!(op = op.verb(), path = %report.path, lines = ?op.lines, "Applied patch operation");
                    run.reports.push(report);
                }
                Err(error) => {
                    warn!(op = op.verb(), path = op.path(), error = %error, "Patch operation failed");
                    run.failed.push(FailedOp {
                        verb: op.verb(),
                        path: op.path().to_string(),
                        error,
                    });
                }
            }
        }

        if let Some(error) = parsed.error {
            warn!(error = %error, "Patch document rejected");
            run.aborted = Some(error);
        }
        run
    }

    fn resolve(&self, path: &str) -> Result<GuardedPath, PatchError> {
        self.guard
            .resolve(path)
            .map_err(|source| PatchError::PathSafety {
                path: path.to_string(),
                source,
            })
    }

    fn apply_op(&self, op: &FileOp) -> Result<OpReport, PatchError> {
        match &op.kind {
            FileOpKind::Add { path, content } => self.add(path, content),
            FileOpKind::Delete { path } => self.delete(path),
            FileOpKind::Overwrite { path, content } => self.overwrite(path, content),
            FileOpKind::Update {
                path,
                move_to,
                hunks,
            } => {
                let target = self.resolve(path)?;
                let dest = move_to.as_deref().map(|m| self.resolve(m)).transpose()?;
                self.update(target, dest, hunks)
            }
        }
    }

    fn add(&self, path: &str, content: &[String]) -> Result<OpReport, PatchError> {
        let target = self.resolve(path)?;
        let rel = target.display();
        let existed = target.absolute.exists();
        if target.absolute.is_dir() || (existed && !self.options.add_overwrites_existing) {
            return Err(PatchError::TargetAlreadyExists { path: rel });
        }

        let old = if existed {
            read_lines(&target)?
        } else {
            Vec::new()
        };
        write_lines(&target, content)?;

        let from = if existed { rel.as_str() } else { "/dev/null" };
        let diff = unified_diff(&old, content, from, &rel, self.options.max_diff_lines);
        Ok(OpReport {
            path: rel,
            outcome: OpOutcome::Added,
            diff,
            warnings: Vec::new(),
        })
    }

    fn delete(&self, path: &str) -> Result<OpReport, PatchError> {
        let target = self.resolve(path)?;
        let rel = target.display();
        if !target.absolute.is_file() {
            return Err(PatchError::TargetNotFound { path: rel });
        }

        let old = read_lines(&target)?;
        fs::remove_file(&target.absolute).map_err(|e| PatchError::io(&rel, e))?;

        let diff = unified_diff(&old, &[], &rel, "/dev/null", self.options.max_diff_lines);
        Ok(OpReport {
            path: rel,
            outcome: OpOutcome::Deleted,
            diff,
            warnings: Vec::new(),
        })
    }

    fn overwrite(&self, path: &str, content: &[String]) -> Result<OpReport, PatchError> {
        let target = self.resolve(path)?;
        let rel = target.display();
        if target.absolute.is_dir() {
            return Err(PatchError::TargetNotFound { path: rel });
        }

        let existed = target.absolute.exists();
        let old = if existed {
            read_lines(&target)?
        } else {
            Vec::new()
        };
        write_lines(&target, content)?;

        let from = if existed { rel.as_str() } else { "/dev/null" };
        let diff = unified_diff(&old, content, from, &rel, self.options.max_diff_lines);
        Ok(OpReport {
            path: rel,
            outcome: OpOutcome::Overwrote,
            diff,
            warnings: Vec::new(),
        })
    }

    fn update(
        &self,
        target: GuardedPath,
        dest: Option<GuardedPath>,
        hunks: &[Hunk],
    ) -> Result<OpReport, PatchError> {
        let rel = target.display();
        if !target.absolute.is_file() {
            return Err(PatchError::TargetNotFound { path: rel });
        }
        // A move onto itself is a plain update.
        let dest = dest.filter(|d| d.absolute != target.absolute);
        if let Some(ref d) = dest {
            if d.absolute.is_dir()
                || (d.absolute.exists() && !self.options.add_overwrites_existing)
            {
                return Err(PatchError::TargetAlreadyExists { path: d.display() });
            }
        }

        let old = read_lines(&target)?;
        let (new, outcomes) = apply_hunks(&old, hunks);

        let mut warnings = Vec::new();
        for (idx, outcome) in outcomes.iter().enumerate() {
            if let HunkOutcome::Skipped { .. } = outcome {
                let locator = hunks[idx]
                    .locator
                    .as_deref()
                    .map(|l| format!(" (`@@ {l}`)"))
                    .unwrap_or_default();
                warn!(path = %rel, hunk = idx + 1, "Hunk context not found, skipped");
                warnings.push(format!(
                    "Could not find context for hunk {}{locator} in `{rel}`; hunk skipped.",
                    idx + 1
                ));
            }
        }

        let any_applied = outcomes.iter().any(HunkOutcome::is_applied);
        // Zero hunks plus a move is a pure rename; otherwise something must apply.
        if !any_applied && (dest.is_none() || !hunks.is_empty()) {
            warnings.push(format!("Update produced no applied hunks for `{rel}`"));
            return Ok(OpReport {
                path: rel,
                outcome: OpOutcome::Unchanged,
                diff: FileDiff::default(),
                warnings,
            });
        }

        if any_applied {
            write_lines(&target, &new)?;
        }

        let to_rel = match dest {
            Some(ref d) => {
                if let Some(parent) = d.absolute.parent() {
                    fs::create_dir_all(parent).map_err(|e| PatchError::io(d.display(), e))?;
                }
                fs::rename(&target.absolute, &d.absolute)
                    .map_err(|e| PatchError::io(d.display(), e))?;
                Some(d.display())
            }
            None => None,
        };

        let diff = unified_diff(
            &old,
            &new,
            &rel,
            to_rel.as_deref().unwrap_or(&rel),
            self.options.max_diff_lines,
        );
        Ok(OpReport {
            path: rel,
            outcome: OpOutcome::Updated { moved_to: to_rel },
            diff,
            warnings,
        })
    }
}

fn read_lines(target: &GuardedPath) -> Result<Vec<String>, PatchError> {
    let text =
        fs::read_to_string(&target.absolute).map_err(|e| PatchError::io(target.display(), e))?;
    Ok(text.lines().map(String::from).collect())
}

/// Write each line followed by `\n`, through a temp file in the same directory.
fn write_lines(target: &GuardedPath, lines: &[String]) -> Result<(), PatchError> {
    let rel = target.display();
    let parent = target
        .absolute
        .parent()
        .ok_or_else(|| PatchError::io(&rel, io::Error::other("path has no parent")))?;
    fs::create_dir_all(parent).map_err(|e| PatchError::io(&rel, e))?;

    let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| PatchError::io(&rel, e))?;
    tmp.write_all(body.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| PatchError::io(&rel, e))?;
    tmp.persist(&target.absolute)
        .map_err(|e| PatchError::io(&rel, e.error))?;
    Ok(())
}
