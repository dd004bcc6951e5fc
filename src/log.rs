use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "cleu=info";

/// Location of the log file. The terminal belongs to the UI, so nothing is
/// logged to stderr once it is running.
pub fn log_path() -> PathBuf {
    let state_dir = if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        PathBuf::from(xdg)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local").join("state")
    } else {
        std::env::temp_dir()
    };
    state_dir.join("cleu").join("cleu.log")
}

/// Install the global subscriber, appending to [`log_path`]. Filtered by
/// `RUST_LOG`, defaulting to info for this crate.
pub fn init() -> Result<(), String> {
    let path = log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| format!("failed to create log directory {}: {}", dir.display(), e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("failed to open log file {}: {}", path.display(), e))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| format!("failed to install logger: {}", e))
}

/// Truncate the log file.
pub fn clear() -> Result<(), String> {
    let path = log_path();
    if !path.exists() {
        return Ok(());
    }
    fs::write(&path, "").map_err(|e| format!("failed to clear log {}: {}", path.display(), e))
}
