//! Integration tests for layered configuration loading.

use std::time::Duration;

use tempfile::TempDir;
use termprobe::types::{ConfigLoader, ConfigSource};
use termprobe::ShellProfile;

#[test]
fn workspace_file_overrides_user_file() {
    let tmp = TempDir::new().expect("should create temp dir");
    let user = tmp.path().join("user.toml");
    let workspace = tmp.path().join("workspace.toml");
    std::fs::write(&user, "shell = \"zsh\"\nkey_delay_ms = 25\n").unwrap();
    std::fs::write(&workspace, "key_delay_ms = 5\n[poll]\ntimeout_ms = 3000\n").unwrap();

    let effective = ConfigLoader::new()
        .with_user_path(user.clone())
        .with_workspace_path(workspace.clone())
        .without_env()
        .load()
        .unwrap();

    let config = &effective.config;
    assert_eq!(config.shell, ShellProfile::Zsh);
    assert_eq!(config.key_delay(), Duration::from_millis(5));
    assert_eq!(config.wait_timeout(), Duration::from_secs(3));
    assert_eq!(config.poll_interval(), Duration::from_millis(20));
    assert_eq!(effective.source_files, vec![user, workspace]);
    assert!(matches!(
        effective.sources.get("key_delay_ms"),
        Some(ConfigSource::WorkspaceFile(_))
    ));
}

#[test]
fn invalid_poll_settings_rejected() {
    let tmp = TempDir::new().expect("should create temp dir");
    let workspace = tmp.path().join("workspace.toml");
    std::fs::write(&workspace, "[poll]\ninterval_ms = 0\n").unwrap();

    let result = ConfigLoader::new()
        .with_user_path(tmp.path().join("missing.toml"))
        .with_workspace_path(workspace)
        .without_env()
        .load();
    assert!(result.is_err());
}
