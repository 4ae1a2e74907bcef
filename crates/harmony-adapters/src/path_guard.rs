use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Why a path was refused.
#[derive(Debug, Error)]
pub enum PathSafetyError {
    #[error("Empty path is not allowed.")]
    Empty,

    #[error("Absolute paths are not allowed: {0}")]
    Absolute(String),

    #[error("Parent traversal is not allowed: {0}")]
    ParentTraversal(String),

    #[error("Path escapes the working root: {0}")]
    Escapes(String),

    #[error("Failed to resolve {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A path that passed the guard: `absolute` lies under the working root,
/// `relative` is how it is shown in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedPath {
    pub absolute: PathBuf,
    pub relative: PathBuf,
}

impl GuardedPath {
    pub fn display(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }
}

/// Working-root scoped path resolver.
/// Every file-system mutation resolves its target through this guard first.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a user-provided relative path.
    /// Rejects absolute paths, any `..` component, and symlinks leading out
    /// of the root. Never touches the file system beyond a canonicalize.
    pub fn resolve(&self, input: &str) -> Result<GuardedPath, PathSafetyError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PathSafetyError::Empty);
        }
        if looks_absolute(trimmed) {
            return Err(PathSafetyError::Absolute(trimmed.to_string()));
        }

        let candidate = Path::new(trimmed);
        let mut relative = PathBuf::new();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(PathSafetyError::ParentTraversal(trimmed.to_string()))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathSafetyError::Absolute(trimmed.to_string()))
                }
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(PathSafetyError::Empty);
        }

        let absolute = self.root.join(&relative);

        // Existing paths may be symlinks; the resolved target must stay inside.
        if absolute.exists() {
            let resolved = absolute
                .canonicalize()
                .map_err(|source| PathSafetyError::Io {
                    path: trimmed.to_string(),
                    source,
                })?;
            if !resolved.starts_with(&self.root) {
                return Err(PathSafetyError::Escapes(trimmed.to_string()));
            }
        } else if let Some(parent) = existing_ancestor(&absolute) {
            let resolved = parent
                .canonicalize()
                .map_err(|source| PathSafetyError::Io {
                    path: trimmed.to_string(),
                    source,
                })?;
            if !resolved.starts_with(&self.root) {
                return Err(PathSafetyError::Escapes(trimmed.to_string()));
            }
        }

        Ok(GuardedPath { absolute, relative })
    }
}

fn looks_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    if cfg!(windows) && path.contains(':') {
        return true;
    }
    Path::new(path).has_root()
}

fn existing_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors().skip(1).find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_relative() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        let p = guard.resolve("./src/lib.rs").unwrap();
        assert_eq!(p.display(), "src/lib.rs");
        assert!(p.absolute.starts_with(guard.root()));
    }

    #[test]
    fn test_rejects_traversal_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        for bad in ["../x", "a/../../x", "a/b/..", "./../x"] {
            assert!(
                matches!(guard.resolve(bad), Err(PathSafetyError::ParentTraversal(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_absolute_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        assert!(matches!(guard.resolve("/etc/passwd"), Err(PathSafetyError::Absolute(_))));
        assert!(matches!(guard.resolve("   "), Err(PathSafetyError::Empty)));
        assert!(matches!(guard.resolve("."), Err(PathSafetyError::Empty)));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        assert!(matches!(guard.resolve("link/new.txt"), Err(PathSafetyError::Escapes(_))));
    }
}
