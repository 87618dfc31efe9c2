use std::process::Command;
use tempfile::TempDir;

fn pathwarden() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pathwarden"))
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let output = pathwarden()
        .current_dir(temp_path)
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    let config_path = temp_path.join(".pathwarden/settings.toml");
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[watcher]"));
    assert!(content.contains("[[watches]]"));

    // A second init without --force refuses to overwrite
    let again = pathwarden()
        .current_dir(temp_path)
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(!again.status.success());

    let forced = pathwarden()
        .current_dir(temp_path)
        .args(["init", "--force"])
        .output()
        .expect("Failed to run init command");
    assert!(forced.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let config_dir = temp_path.join(".pathwarden");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        r#"
[watcher]
poll_interval_ms = 1234

[[watches]]
input_path = "/srv/inbox"
mode = "file"
"#,
    )
    .unwrap();

    let output = pathwarden()
        .current_dir(temp_path)
        .arg("config")
        .output()
        .expect("Failed to run config command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll_interval_ms = 1234"));
    assert!(stdout.contains("/srv/inbox"));
    assert!(stdout.contains("mode = \"file\""));
}

#[test]
fn test_run_without_watches_fails() {
    let temp_dir = TempDir::new().unwrap();

    let output = pathwarden()
        .current_dir(temp_dir.path())
        .arg("run")
        .output()
        .expect("Failed to run run command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[[watches]]"));
}
