mod common;

use std::process::{Command, Output};

use common::{ProviderDirs, minimal_satellite};

fn run(dirs: &ProviderDirs, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_abm-providers"))
        .arg("--providers-dir")
        .arg(dirs.builtin.path())
        .arg("--user-dir")
        .arg(dirs.user.path())
        .arg("--cache-file")
        .arg(dirs.cache_file())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute abm-providers")
}

#[test]
fn test_cli_help_output() {
    let output = Command::new(env!("CARGO_BIN_EXE_abm-providers"))
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for flag in [
        "--providers-dir",
        "--user-dir",
        "--cache-file",
        "--no-cache",
        "--threads",
        "--format",
        "--verbose",
        "--quiet",
        "--config",
    ] {
        assert!(stdout.contains(flag), "help should mention {}", flag);
    }
    assert!(stdout.contains("clear-cache"));
}

#[test]
fn test_list_json() {
    let dirs = ProviderDirs::new();
    dirs.write_builtin("test.xml", &minimal_satellite("Test"));
    dirs.write_builtin("broken.xml", "<provider>");

    let output = run(&dirs, &["--format", "json", "list"]);

    assert!(output.status.success());
    let providers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(providers["test"]["name"], "Test");
    assert!(providers.get("broken").is_none());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.xml"));
}

#[test]
fn test_default_command_prints_summary() {
    let dirs = ProviderDirs::new();
    dirs.write_builtin("test.xml", &minimal_satellite("Test"));

    let output = run(&dirs, &["--no-cache"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Test [sky, DVB-S] 1 bouquet"));
    assert!(stdout.contains("Provider Summary:"));
    assert!(!dirs.cache_file().exists());
}

#[test]
fn test_show_provider() {
    let dirs = ProviderDirs::new();
    dirs.write_builtin("test.xml", &minimal_satellite("Test"));

    let output = run(&dirs, &["show", "test"]);
    assert!(output.status.success());
    let provider: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(provider["servicehacks"], "True");
    assert_eq!(provider["bouquets"]["1"]["bouquet"], 1);

    let output = run(&dirs, &["show", "absent"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_exists_exit_codes() {
    let dirs = ProviderDirs::new();
    dirs.write_user("mine.xml", "not even xml");

    assert_eq!(run(&dirs, &["exists", "mine"]).status.code(), Some(0));
    assert_eq!(run(&dirs, &["exists", "theirs"]).status.code(), Some(1));
}

#[test]
fn test_clear_cache() {
    let dirs = ProviderDirs::new();
    dirs.write_builtin("test.xml", &minimal_satellite("Test"));

    assert!(run(&dirs, &["-q", "list"]).status.success());
    assert!(dirs.cache_file().exists());

    let output = run(&dirs, &["clear-cache"]);
    assert!(output.status.success());
    assert!(!dirs.cache_file().exists());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Removed"));
}

#[test]
fn test_configuration_error_exit_code() {
    let dirs = ProviderDirs::new();
    let config = dirs.cache.path().join("abm.yaml");
    std::fs::write(&config, "paths: {}").unwrap();

    let output = run(&dirs, &["--config", config.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration error"));
}
