use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use harmony_runtime::ToolError;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};

/// Form of the code handed to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecKind {
    /// Python source, run with `python -c`
    Python,
    /// Shell command line, run with `sh -c` (`cmd /C` on Windows)
    Shell,
}

impl ExecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecKind::Python => "python",
            ExecKind::Shell => "shell",
        }
    }

    /// Code-fence language for the source echo.
    pub fn lexer(&self) -> &'static str {
        match self {
            ExecKind::Python => "python",
            ExecKind::Shell => "bash",
        }
    }
}

/// Captured outcome of one child process. A non-zero exit is still a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs one command per call as a child of the working root.
#[derive(Debug, Clone)]
pub struct ExecRunner {
    root: PathBuf,
    python_bin: String,
    default_timeout: Duration,
    dry_run: bool,
}

impl ExecRunner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            python_bin: "python3".to_string(),
            default_timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }

    pub fn with_python_bin(mut self, python_bin: &str) -> Self {
        self.python_bin = python_bin.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn command(&self, kind: ExecKind, code: &str) -> Command {
        let mut cmd = match kind {
            ExecKind::Python => {
                let mut c = Command::new(&self.python_bin);
                c.arg("-c").arg(code);
                c
            }
            ExecKind::Shell if cfg!(windows) => {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(code);
                c
            }
            ExecKind::Shell => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(code);
                c
            }
        };
        cmd.current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `code` to completion or until `timeout` (default when `None`)
    /// elapses, in which case the child is killed.
    pub async fn run(
        &self,
        kind: ExecKind,
        code: &str,
        timeout: Option<Duration>,
    ) -> Result<ExecutionResult, ToolError> {
        let timeout = timeout.unwrap_or(self.default_timeout);

        if self.dry_run {
            warn!(kind = kind.as_str(), code, "DRY RUN - command not executed");
            return Ok(ExecutionResult {
                stdout: format!("[dry-run] {} not executed", kind.as_str()),
                stderr: String::new(),
                exit_code: 0,
            });
        }

        // Audit log: record exact code being executed
        info!(kind = kind.as_str(), code, timeout_secs = timeout.as_secs(), "Executing command");

        let child = self
            .command(kind, code)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed {
                message: format!("failed to spawn {}: {e}", kind.as_str()),
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                message: e.to_string(),
            })?,
            Err(_) => {
                warn!(kind = kind.as_str(), timeout_secs = timeout.as_secs(), "Command timed out, killed");
                return Err(ToolError::Timeout {
                    secs: timeout.as_secs(),
                });
            }
        };

        let exit_code = exit_code(output.status);
        info!(kind = kind.as_str(), exit_code, "Command finished");
        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }
}

/// Exit code, or `-signal` for a child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner() -> (ExecRunner, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (ExecRunner::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_captures_streams_and_exit_code() {
        let (runner, _dir) = runner();
        let result = runner
            .run(ExecKind::Shell, "echo out; echo err >&2; exit 3", None)
            .await
            .unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_runs_in_working_root_with_closed_stdin() {
        let (runner, dir) = runner();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let result = runner
            .run(ExecKind::Shell, "ls; cat", Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(result.stdout.contains("marker.txt"));
        assert!(result.success());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_error() {
        let (runner, _dir) = runner();
        let err = runner
            .run(ExecKind::Shell, "sleep 5", Some(Duration::from_millis(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_signal_exit_is_negative() {
        let (runner, _dir) = runner();
        let result = runner.run(ExecKind::Shell, "kill -9 $$", None).await.unwrap();
        assert_eq!(result.exit_code, -9);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_execution_failure() {
        let (runner, _dir) = runner();
        let runner = runner.with_python_bin("definitely-not-a-python-binary");
        let err = runner.run(ExecKind::Python, "print(1)", None).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let (runner, dir) = runner();
        let runner = runner.with_dry_run(true);
        let result = runner
            .run(ExecKind::Shell, "touch created.txt", None)
            .await
            .unwrap();
        assert!(result.success());
        assert!(!dir.path().join("created.txt").exists());
    }
}
