use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(dir: &Path, data_file: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_task_cli"))
        .args(args)
        .current_dir(dir)
        .env("TASK_CLI_DATA_FILE", data_file)
        .env("TASK_CLI_CONFIG_PATH", dir.join("config.json"))
        .env_remove("TASK_CLI_LOG")
        .output()
        .expect("failed to run task_cli")
}

fn backup_count(dir: &Path) -> usize {
    match std::fs::read_dir(dir.join("backups")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[test]
fn invalid_json_starts_empty_and_keeps_a_backup() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    std::fs::write(&data_file, "{ not valid json").unwrap();

    let listed = run(dir.path(), &data_file, &["list"]);
    assert!(listed.status.success());
    assert!(String::from_utf8_lossy(&listed.stderr).contains("WARNING: invalid_data"));
    assert!(String::from_utf8_lossy(&listed.stdout).contains("No tasks found."));

    let added = run(dir.path(), &data_file, &["add", "Fresh start"]);
    assert!(String::from_utf8_lossy(&added.stdout).contains("Task added successfully (ID: 1)"));

    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backups"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "{ not valid json");
}

#[test]
fn legacy_records_are_migrated_on_read_only() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    let legacy = serde_json::json!({
        "tasks": [
            {
                "id": 4,
                "description": "Old task",
                "status": "in-progress",
                "createdAt": "2024-01-01 09:00:00.000000",
                "updatedAt": "2024-01-02 09:00:00.000000"
            }
        ],
        "next_id": 5
    });
    let original = serde_json::to_string_pretty(&legacy).unwrap();
    std::fs::write(&data_file, &original).unwrap();

    let output = run(dir.path(), &data_file, &["--json", "list"]);

    let tasks: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&output.stdout).trim()).expect("json output");
    assert_eq!(tasks[0]["category"], "general");
    assert_eq!(tasks[0]["priority"], "medium");
    assert!(tasks[0]["due_date"].is_null());
    assert_eq!(std::fs::read_to_string(&data_file).unwrap(), original);

    let added = run(dir.path(), &data_file, &["add", "New task"]);
    assert!(String::from_utf8_lossy(&added.stdout).contains("(ID: 5)"));
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&data_file).unwrap()).unwrap();
    assert_eq!(stored["tasks"][0]["category"], "general");
    assert_eq!(stored["next_id"], 6);
}

#[test]
fn backups_are_pruned_to_configured_count() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    std::fs::write(dir.path().join("config.json"), r#"{ "backup_count": 2 }"#).unwrap();

    for description in ["one", "two", "three", "four", "five"] {
        run(dir.path(), &data_file, &["add", description]);
    }

    let count = backup_count(dir.path());
    assert!((1..=2).contains(&count), "unexpected backup count {count}");

    let listed = run(dir.path(), &data_file, &["--json", "backups"]);
    let paths: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&listed.stdout).trim()).expect("json output");
    assert_eq!(paths.as_array().map(Vec::len), Some(count));
}

#[test]
fn disabled_backups_leave_no_directory() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    std::fs::write(dir.path().join("config.json"), r#"{ "backup_enabled": false }"#).unwrap();

    run(dir.path(), &data_file, &["add", "one"]);
    run(dir.path(), &data_file, &["add", "two"]);

    assert_eq!(backup_count(dir.path()), 0);
    let listed = run(dir.path(), &data_file, &["backups"]);
    assert!(String::from_utf8_lossy(&listed.stdout).contains("No backups found."));
}

#[test]
fn invalid_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    std::fs::write(dir.path().join("config.json"), "{ broken").unwrap();

    let output = run(dir.path(), &data_file, &["add", "Still works"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Using default configuration."));
    assert!(data_file.exists());
}

#[test]
fn unwritable_data_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("occupied");
    std::fs::create_dir(&data_file).unwrap();

    let output = run(dir.path(), &data_file, &["add", "Cannot save"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: io_error"));
}

#[cfg(unix)]
#[test]
fn interrupt_is_reported_and_exits_non_zero() {
    use std::process::Stdio;
    use std::time::Duration;

    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("tasks.json");
    // Reading a FIFO blocks until a writer opens it, which holds the command
    // mid-load until the signal arrives.
    let made = Command::new("mkfifo").arg(&data_file).status().unwrap();
    assert!(made.success());

    let child = Command::new(env!("CARGO_BIN_EXE_task_cli"))
        .arg("list")
        .current_dir(dir.path())
        .env("TASK_CLI_DATA_FILE", &data_file)
        .env("TASK_CLI_CONFIG_PATH", dir.path().join("config.json"))
        .env_remove("TASK_CLI_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start task_cli");
    std::thread::sleep(Duration::from_millis(500));

    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());
    let output = child.wait_with_output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Operation cancelled by user."));
    assert_eq!(backup_count(dir.path()), 0);
}
