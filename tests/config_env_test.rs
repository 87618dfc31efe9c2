use pathwarden::Settings;
use pathwarden::watcher::{PlatformChoice, WatchMode};
use std::env;
use std::fs;
use tempfile::TempDir;

// One test per binary: it changes the working directory and the environment.
#[test]
fn test_layered_config_with_env_override() {
    let temp_dir = TempDir::new().unwrap();
    let original_dir = env::current_dir().unwrap();

    let config_dir = temp_dir.path().join(".pathwarden");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        r#"
[watcher]
poll_interval_ms = 800
coalesce_window_ms = 40

[[watches]]
input_path = "inbox"
mode = "dir"
"#,
    )
    .unwrap();

    // Start from a subdirectory: the config directory is found by walking up
    let nested = temp_dir.path().join("a/b");
    fs::create_dir_all(&nested).unwrap();
    env::set_current_dir(&nested).unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("PATHWARDEN_WATCHER__POLL_INTERVAL_MS", "120");
        env::set_var("PATHWARDEN_WATCHER__PLATFORM", "windows");
        env::set_var("PATHWARDEN_LOGGING__DEFAULT", "debug");
    }

    let settings = Settings::load();

    unsafe {
        env::remove_var("PATHWARDEN_WATCHER__POLL_INTERVAL_MS");
        env::remove_var("PATHWARDEN_WATCHER__PLATFORM");
        env::remove_var("PATHWARDEN_LOGGING__DEFAULT");
    }
    env::set_current_dir(original_dir).unwrap();

    let settings = settings.unwrap();
    // Environment beats the file
    assert_eq!(settings.watcher.poll_interval_ms, 120);
    assert_eq!(settings.watcher.platform, PlatformChoice::Windows);
    assert_eq!(settings.logging.default, "debug");
    // File beats defaults
    assert_eq!(settings.watcher.coalesce_window_ms, 40);
    assert_eq!(settings.watches.len(), 1);
    assert_eq!(settings.watches[0].mode, WatchMode::Dir);
    // Defaults fill the rest
    assert_eq!(settings.watcher.stop_timeout_secs, 10);
}
