use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Run the binary with a scrubbed environment rooted in `home`.
fn run_cleu(home: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cleu"));
    command
        .args(args)
        .env_clear()
        .env("HOME", home)
        .env("XDG_STATE_HOME", home.join("state"))
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("PATH", std::env::var("PATH").unwrap_or_default());
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("run cleu")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    let output = run_cleu(home.path(), &["--help"], &[]);
    assert!(output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Usage: cleu [read|send]"));
    assert!(err.contains("IMAP_HOST"));
}

#[test]
fn test_read_reports_every_missing_variable() {
    let home = tempfile::tempdir().unwrap();
    let output = run_cleu(home.path(), &[], &[("IMAP_HOST", "imap.example.com")]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("IMAP_USERNAME"), "stderr: {}", err);
    assert!(err.contains("IMAP_PASSWORD"));
    assert!(err.contains("IMAP_PORT"));
    assert!(!err.contains("IMAP_HOST"));
}

#[test]
fn test_send_requires_smtp_settings() {
    let home = tempfile::tempdir().unwrap();
    let output = run_cleu(home.path(), &["send"], &[]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("SMTP_HOST"), "stderr: {}", err);
    assert!(err.contains("SMTP_PASSWORD"));
    assert!(!err.contains("FROM_EMAIL"));
}

#[test]
fn test_invalid_port_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    let output = run_cleu(
        home.path(),
        &["read"],
        &[
            ("IMAP_HOST", "imap.example.com"),
            ("IMAP_PORT", "imaps"),
            ("IMAP_USERNAME", "me@example.com"),
            ("IMAP_PASSWORD", "secret"),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("IMAP_PORT must be a port number"));
}

#[test]
fn test_malformed_config_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    let config_path = home.path().join("bad.toml");
    fs::write(&config_path, "[ui]\npage_size = 0\n").unwrap();
    let arg = format!("--config={}", config_path.display());
    let output = run_cleu(home.path(), &[&arg], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("page_size"));
}

#[test]
fn test_missing_explicit_config_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    let arg = format!("--config={}", home.path().join("nope.toml").display());
    let output = run_cleu(home.path(), &[&arg], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("failed to read config file"));
}

#[test]
fn test_unknown_argument_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = run_cleu(home.path(), &["--frobnicate"], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown argument '--frobnicate'"));
}

#[test]
fn test_log_and_clear_log() {
    let home = tempfile::tempdir().unwrap();
    let log_dir = home.path().join("state").join("cleu");
    fs::create_dir_all(&log_dir).unwrap();
    fs::write(log_dir.join("cleu.log"), "earlier entry\n").unwrap();

    let output = run_cleu(home.path(), &["--log"], &[("PAGER", "cat")]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "earlier entry\n");

    let output = run_cleu(home.path(), &["--clear-log", "--log"], &[("PAGER", "cat")]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}
