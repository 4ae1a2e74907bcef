//! Line-oriented patch documents: grammar, hunk matching, diff accounting and
//! the engine that applies a document to a working root.
//!
//! ```text
//! *** Begin Patch
//! *** Update File: src/app.py
//! *** Move to: src/main.py
//! @@ def main():
//! -    print("hi")
//! +    print("hello")
//! *** End Patch
//! ```

pub mod diff;
pub mod engine;
pub mod matcher;
pub mod parser;
pub mod report;

use std::io;
use std::ops::Range;

use thiserror::Error;

use crate::path_guard::PathSafetyError;

pub use diff::{unified_diff, FileDiff};
pub use engine::{FailedOp, OpOutcome, OpReport, PatchEngine, PatchRun};
pub use matcher::{apply_hunks, HunkOutcome};
pub use parser::{parse_patch, ParsedPatch};
pub use report::render_run;

/// Failures of a patch document or of one of its operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Malformed envelope, header or line prefix. Aborts the rest of the document.
    #[error("{message} (patch line {line})")]
    Grammar { line: usize, message: String },

    #[error("Invalid path `{path}`: {source}")]
    PathSafety {
        path: String,
        #[source]
        source: PathSafetyError,
    },

    #[error("Target does not exist or is not a regular file: `{path}`")]
    TargetNotFound { path: String },

    #[error("Target already exists: `{path}`")]
    TargetAlreadyExists { path: String },

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl PatchError {
    pub fn grammar(line: usize, message: impl Into<String>) -> Self {
        Self::Grammar {
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_grammar(&self) -> bool {
        matches!(self, Self::Grammar { .. })
    }
}

/// One body line of a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

/// One localized edit inside an `Update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    /// Free text after `@@`, if any.
    pub locator: Option<String>,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Context and removed lines, in order: what must already be in the file.
    pub fn before(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect()
    }

    /// Context and added lines, in order: what replaces `before`.
    pub fn after(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Add(s) => Some(s.as_str()),
                HunkLine::Remove(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOpKind {
    Add {
        path: String,
        content: Vec<String>,
    },
    Delete {
        path: String,
    },
    Overwrite {
        path: String,
        content: Vec<String>,
    },
    Update {
        path: String,
        move_to: Option<String>,
        hunks: Vec<Hunk>,
    },
}

/// A parsed operation and the 1-based line span it covers in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOp {
    pub kind: FileOpKind,
    pub lines: Range<usize>,
}

impl FileOp {
    pub fn path(&self) -> &str {
        match &self.kind {
            FileOpKind::Add { path, .. }
            | FileOpKind::Delete { path }
            | FileOpKind::Overwrite { path, .. }
            | FileOpKind::Update { path, .. } => path,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self.kind {
            FileOpKind::Add { .. } => "Add",
            FileOpKind::Delete { .. } => "Delete",
            FileOpKind::Overwrite { .. } => "Overwrite",
            FileOpKind::Update { .. } => "Update",
        }
    }
}

/// Knobs of the patch engine, read from `[patch]` in the config.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// `Add File` over an existing regular file overwrites it instead of failing.
    pub add_overwrites_existing: bool,
    /// Lines kept per file diff before the hidden-lines marker.
    pub max_diff_lines: usize,
    /// Per-file sections shown in a report.
    pub max_sections: usize,
    /// Character ceiling of the model view.
    pub model_max_chars: usize,
    pub display_max_lines: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            add_overwrites_existing: false,
            max_diff_lines: 300,
            max_sections: 12,
            model_max_chars: 25_000,
            display_max_lines: harmony_runtime::markdown::DISPLAY_MAX_LINES,
        }
    }
}
