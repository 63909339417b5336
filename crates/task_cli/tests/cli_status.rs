use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_task_cli"))
        .args(args)
        .current_dir(dir)
        .env("TASK_CLI_DATA_FILE", dir.join("tasks.json"))
        .env("TASK_CLI_CONFIG_PATH", dir.join("config.json"))
        .env_remove("TASK_CLI_LOG")
        .output()
        .expect("failed to run task_cli")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read_store(dir: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(dir.join("tasks.json")).expect("data file");
    serde_json::from_str(&content).expect("valid json")
}

#[test]
fn groceries_lifecycle() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["add", "Buy groceries"]);
    let created_at = read_store(dir.path())["tasks"][0]["createdAt"].clone();

    let done = run(dir.path(), &["mark-done", "1"]);
    assert!(stdout(&done).contains("Task 1 marked as done."));
    let stored = read_store(dir.path());
    assert_eq!(stored["tasks"][0]["status"], "done");
    assert_eq!(stored["tasks"][0]["createdAt"], created_at);
    assert_ne!(stored["tasks"][0]["updatedAt"], created_at);

    let again = run(dir.path(), &["mark-done", "1"]);
    assert!(again.status.success());
    assert!(stdout(&again).contains("Task 1 is already done."));

    let deleted = run(dir.path(), &["delete", "1"]);
    assert!(stdout(&deleted).contains("Task 1 deleted successfully."));
    let stored = read_store(dir.path());
    assert_eq!(stored["tasks"].as_array().map(Vec::len), Some(0));
    assert_eq!(stored["next_id"], 2);
}

#[test]
fn mark_in_progress_reports_transitions() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["add", "Write report"]);

    let first = run(dir.path(), &["mark-in-progress", "1"]);
    let second = run(dir.path(), &["mark-in-progress", "1"]);
    let json = run(dir.path(), &["--json", "mark-in-progress", "1"]);

    assert!(stdout(&first).contains("Task 1 marked as in progress."));
    assert!(stdout(&second).contains("Task 1 is already in progress."));
    let value: serde_json::Value = serde_json::from_str(stdout(&json).trim()).unwrap();
    assert_eq!(value["changed"], false);
    assert_eq!(read_store(dir.path())["tasks"][0]["status"], "in-progress");
}

#[test]
fn unknown_id_is_reported_with_success_exit() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["add", "Only task"]);

    for args in [
        vec!["mark-done", "42"],
        vec!["mark-in-progress", "42"],
        vec!["delete", "42"],
        vec!["update", "42", "New text"],
    ] {
        let output = run(dir.path(), &args);
        assert!(output.status.success());
        assert!(
            String::from_utf8_lossy(&output.stderr)
                .contains("ERROR: not_found - Task with ID 42 not found.")
        );
    }
    assert_eq!(read_store(dir.path())["tasks"].as_array().map(Vec::len), Some(1));
}

#[test]
fn update_replaces_description_and_supplied_fields() {
    let dir = TempDir::new().unwrap();
    run(dir.path(), &["add", "Draft report", "--priority", "high"]);

    let output = run(dir.path(), &["update", "1", "Final report", "--category", "Work"]);

    assert!(stdout(&output).contains("Task 1 updated successfully."));
    let task = &read_store(dir.path())["tasks"][0];
    assert_eq!(task["description"], "Final report");
    assert_eq!(task["category"], "work");
    assert_eq!(task["priority"], "high");
}

#[test]
fn non_numeric_id_fails_argument_parsing() {
    let dir = TempDir::new().unwrap();

    let output = run(dir.path(), &["delete", "abc"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
}
