mod backend;
mod compose;
mod config;
mod log;
mod mailbox;
mod mime;
mod render;
mod send;
mod session;
mod tui;

use config::{Config, ImapSettings, SmtpSettings};
use std::path::PathBuf;
use std::process::Command;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Send,
}

fn print_usage() {
    eprintln!("Usage: cleu [read|send] [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  read             Browse the mailbox (default)");
    eprintln!("  send             Compose and send an email");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config=PATH    Use config file at PATH instead of default");
    eprintln!("  --clear-log      Truncate the log file at startup");
    eprintln!("  --log            View the log file in $PAGER");
    eprintln!("  --help           Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  read: IMAP_HOST, IMAP_PORT, IMAP_USERNAME, IMAP_PASSWORD");
    eprintln!("  send: SMTP_HOST, SMTP_PORT, SMTP_USERNAME, SMTP_PASSWORD, FROM_EMAIL (optional)");
    eprintln!();
    eprintln!("Default config file: {}", config::default_config_path().display());
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn show_log() {
    let path = log::log_path();
    if !path.exists() {
        fail(format!("no log file found at {}", path.display()));
    }
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    let status = Command::new(&pager).arg(&path).status();
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => std::process::exit(s.code().unwrap_or(1)),
        Err(e) => fail(format!("failed to launch pager '{}': {}", pager, e)),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut mode = Mode::Read;
    let mut config_path: Option<PathBuf> = None;
    for arg in &args {
        match arg.as_str() {
            "read" => mode = Mode::Read,
            "send" => mode = Mode::Send,
            "--log" | "--clear-log" => {}
            a if a.starts_with("--config=") => {
                config_path = Some(PathBuf::from(&a["--config=".len()..]));
            }
            other => {
                eprintln!("Unknown argument '{}'", other);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    if args.iter().any(|a| a == "--clear-log") {
        if let Err(e) = log::clear() {
            fail(e);
        }
    }

    if args.iter().any(|a| a == "--log") {
        show_log();
        std::process::exit(0);
    }

    if let Err(e) = log::init() {
        eprintln!("Warning: {}", e);
    }

    let config = match &config_path {
        // An explicit path must exist
        Some(path) => Config::load(path),
        None => Config::load_or_default(config::default_config_path()),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("config error: {}", e);
            fail(e);
        }
    };

    match mode {
        Mode::Read => {
            let imap = match ImapSettings::from_env() {
                Ok(s) => s,
                Err(e) => fail(e),
            };
            info!(host = %imap.host, mailbox = %config.mail.mailbox, "starting reader");
            match tui::run(imap, &config) {
                Ok(None) => {}
                Ok(Some(failure)) => {
                    error!("session ended: {}", failure.message);
                    fail(failure.message);
                }
                Err(e) => {
                    error!("terminal error: {}", e);
                    fail(format!("terminal error: {}", e));
                }
            }
        }
        Mode::Send => {
            let smtp = match SmtpSettings::from_env() {
                Ok(s) => s,
                Err(e) => fail(e),
            };
            let editor = config
                .ui
                .editor
                .clone()
                .or_else(|| std::env::var("EDITOR").ok())
                .unwrap_or_else(|| "vi".to_string());
            if let Err(e) = send::run(&smtp, &editor) {
                error!("send failed: {}", e);
                fail(e);
            }
        }
    }
}
