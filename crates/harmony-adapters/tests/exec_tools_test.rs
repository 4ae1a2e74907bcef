//! Execution tools driven through the executor, with the output cache in play.
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use harmony_adapters::{
    register_cache_tool, register_exec_tools, ExecRunner, OutputCache, OutputFormatter,
    OutputLimits, ViewRequest,
};
use harmony_runtime::ToolExecutor;
use serde_json::json;

struct Harness {
    executor: ToolExecutor,
    cache: Arc<OutputCache>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(OutputCache::new());
    let runner = Arc::new(ExecRunner::new(dir.path()).with_timeout(Duration::from_secs(10)));
    let formatter = Arc::new(OutputFormatter::new(OutputLimits::default(), cache.clone()));

    let executor = ToolExecutor::new();
    register_exec_tools(&executor, runner, formatter).unwrap();
    register_cache_tool(&executor, cache.clone(), 10).unwrap();
    Harness {
        executor,
        cache,
        _dir: dir,
    }
}

fn cache_id(text: &str) -> String {
    text.split('`')
        .find(|s| s.starts_with("cache-"))
        .expect("report names a cache id")
        .to_string()
}

#[tokio::test]
async fn test_failed_command_reports_exit_code_and_stderr() {
    let h = harness();
    let report = h
        .executor
        .execute("shell", json!({"command": "echo 'no such thing' >&2; exit 1"}))
        .await;

    assert!(report.model_text.starts_with("## Command FAILED (Exit Code: 1)\n"));
    assert!(report.model_text.contains("no such thing"));
    assert!(!report.model_text.contains("truncated"));
    assert!(!report.model_text.contains("cache-"));
    assert!(!report.is_error());
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_ten_thousand_lines_are_cached_and_windowed() {
    let h = harness();
    let report = h
        .executor
        .execute("exec", json!({"kind": "shell", "code": "seq 1 10000"}))
        .await;

    assert!(report.model_text.starts_with("## Command Successful\n"));
    let id = cache_id(&report.model_text);
    assert!(report.model_text.contains("(10000 lines)"));

    let slice = h
        .cache
        .view(
            &id,
            ViewRequest::Lines {
                start: 0,
                count: 50,
                before: 0,
                after: 0,
            },
        )
        .unwrap();
    assert_eq!(slice.total, 10_000);
    let lines: Vec<&str> = slice.text.lines().collect();
    assert_eq!(lines.len(), 50);
    assert_eq!(lines[0], "1");
    assert_eq!(lines[49], "50");

    let view = h
        .executor
        .execute("cache", json!({"action": "view", "id": id, "start": 0, "count": 50}))
        .await;
    assert!(view.model_text.contains("Showing lines 0-49 of 10000 lines (total=10000)."));
}

#[tokio::test]
async fn test_python_tool_runs_in_working_root() {
    let h = harness();
    let report = h
        .executor
        .execute(
            "python",
            json!({"code": "import os\nprint(sorted(os.listdir('.')))"}),
        )
        .await;
    // python3 may be absent on minimal hosts; both outcomes are well-formed reports.
    if report.is_error() {
        assert!(report.model_text.contains("Execution failed"));
    } else {
        assert!(report.model_text.contains("```python\n[]\n```"));
    }
}

#[tokio::test]
async fn test_timeout_becomes_error_envelope() {
    let h = harness();
    let report = h
        .executor
        .execute("shell", json!({"command": "sleep 5", "timeout": 1}))
        .await;
    assert_eq!(report.model_text, "## Error\nExecution timed out after 1s.");
}

#[tokio::test]
async fn test_cache_miss_after_drop() {
    let h = harness();
    let id = h.cache.insert("payload");
    let dropped = h
        .executor
        .execute("cache", json!({"action": "drop", "id": id}))
        .await;
    assert!(!dropped.is_error());

    let again = h
        .executor
        .execute("cache", json!({"action": "view", "id": id}))
        .await;
    assert_eq!(again.model_text, format!("## Error\nCache ID '{id}' not found."));
}

#[tokio::test]
async fn test_schemas_cover_every_tool() {
    let h = harness();
    assert_eq!(
        h.executor.tool_names(),
        vec!["cache", "exec", "python", "shell"]
    );
}
