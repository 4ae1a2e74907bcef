use std::process::Command;

fn harmony(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--bin", "harmony", "--"])
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_harmony_version() {
    let output = harmony(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_harmony_help() {
    let output = harmony(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["init", "chat", "exec", "patch"] {
        assert!(stdout.contains(subcommand), "missing {subcommand}");
    }
}

#[test]
fn test_harmony_patch_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let patch = dir.path().join("change.patch");
    std::fs::write(&patch, "*** Begin Patch\n*** Add File: a.txt\n+hello\n*** End Patch\n").unwrap();

    let output = harmony(&[
        "--workspace",
        dir.path().to_str().unwrap(),
        "patch",
        patch.to_str().unwrap(),
        "--model-view",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added a.txt (+1/-0, net +1)"));
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "hello\n");
}

#[test]
fn test_harmony_exec_dry_run() {
    let dir = tempfile::tempdir().unwrap();
    let output = harmony(&[
        "--workspace",
        dir.path().to_str().unwrap(),
        "--execution-mode",
        "dry-run",
        "exec",
        "--kind",
        "shell",
        "touch made.txt",
    ]);
    assert!(output.status.success());
    assert!(!dir.path().join("made.txt").exists());
}
