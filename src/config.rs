use crate::mailbox::trash::DEFAULT_TRASH_FOLDERS;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// IMAP connection parameters, read from the environment.
#[derive(Debug, Clone)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// SMTP connection parameters, read from the environment.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ui: UiConfig,
    pub mail: MailConfig,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub editor: Option<String>,
    pub page_size: u32,
    pub banner_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub mailbox: String,
    pub trash_folders: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("please set the {} environment variable(s)", .0.join(", "))]
    MissingEnv(Vec<&'static str>),
    #[error("{var} must be a port number, got '{value}'")]
    InvalidPort { var: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    ui: RawUiConfig,
    #[serde(default)]
    mail: RawMailConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawUiConfig {
    #[serde(default)]
    editor: Option<String>,
    #[serde(default = "default_page_size")]
    page_size: u32,
    #[serde(default = "default_banner_secs")]
    banner_secs: u64,
}

impl Default for RawUiConfig {
    fn default() -> Self {
        Self {
            editor: None,
            page_size: default_page_size(),
            banner_secs: default_banner_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMailConfig {
    #[serde(default = "default_mailbox")]
    mailbox: String,
    #[serde(default = "default_trash_folders")]
    trash_folders: Vec<String>,
}

impl Default for RawMailConfig {
    fn default() -> Self {
        Self {
            mailbox: default_mailbox(),
            trash_folders: default_trash_folders(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_banner_secs() -> u64 {
    3
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_trash_folders() -> Vec<String> {
    DEFAULT_TRASH_FOLDERS.iter().map(|s| s.to_string()).collect()
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("cleu").join("config.toml")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".config")
            .join("cleu")
            .join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

impl Config {
    /// Load `path`, or fall back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if raw.ui.page_size == 0 {
            return Err(ConfigError::Parse(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if raw.mail.mailbox.trim().is_empty() {
            return Err(ConfigError::Parse("mailbox must not be empty".to_string()));
        }
        if raw.mail.trash_folders.is_empty() {
            return Err(ConfigError::Parse(
                "trash_folders must list at least one folder".to_string(),
            ));
        }

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        Config {
            ui: UiConfig {
                editor: raw.ui.editor,
                page_size: raw.ui.page_size,
                banner_secs: raw.ui.banner_secs,
            },
            mail: MailConfig {
                mailbox: raw.mail.mailbox,
                trash_folders: raw.mail.trash_folders,
            },
        }
    }
}

/// Collects required variables so every missing one is reported at once.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn new(lookup: F) -> Self {
        EnvReader {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, var: &str) -> Option<String> {
        (self.lookup)(var).filter(|v| !v.trim().is_empty())
    }

    fn required(&mut self, var: &'static str) -> String {
        match self.optional(var) {
            Some(value) => value,
            None => {
                self.missing.push(var);
                String::new()
            }
        }
    }

    fn finish(self) -> Result<(), ConfigError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingEnv(self.missing))
        }
    }
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidPort {
        var,
        value: value.to_string(),
    })
}

impl ImapSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut env = EnvReader::new(lookup);
        let username = env.required("IMAP_USERNAME");
        let password = env.required("IMAP_PASSWORD");
        let host = env.required("IMAP_HOST");
        let port = env.required("IMAP_PORT");
        env.finish()?;

        Ok(ImapSettings {
            port: parse_port("IMAP_PORT", &port)?,
            host,
            username,
            password,
        })
    }
}

impl SmtpSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let mut env = EnvReader::new(lookup);
        let host = env.required("SMTP_HOST");
        let port = env.required("SMTP_PORT");
        let username = env.required("SMTP_USERNAME");
        let password = env.required("SMTP_PASSWORD");
        let from = env.optional("FROM_EMAIL");
        env.finish()?;

        Ok(SmtpSettings {
            port: parse_port("SMTP_PORT", &port)?,
            from: from.unwrap_or_else(|| username.clone()),
            host,
            username,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.ui.page_size, 50);
        assert_eq!(config.ui.banner_secs, 3);
        assert_eq!(config.mail.mailbox, "INBOX");
        assert_eq!(config.mail.trash_folders[0], "Trash");
        assert_eq!(config.mail.trash_folders.len(), 5);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[ui]
page_size = 25
editor = "nvim"

[mail]
mailbox = "Work"
trash_folders = ["Bin"]
"#,
        )
        .unwrap();

        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.ui.page_size, 25);
        assert_eq!(config.ui.editor.as_deref(), Some("nvim"));
        assert_eq!(config.ui.banner_secs, 3);
        assert_eq!(config.mail.mailbox, "Work");
        assert_eq!(config.mail.trash_folders, vec!["Bin".to_string()]);
    }

    #[test]
    fn test_unknown_key_errors() {
        let err = Config::parse("[ui]\nmouse = true\n").unwrap_err();
        match err {
            ConfigError::Parse(msg) => assert!(msg.contains("unknown field"), "got: {}", msg),
            _ => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::parse("[ui]\npage_size = 0\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("[mail]\ntrash_folders = []\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_imap_env() {
        let settings = ImapSettings::from_lookup(lookup(&[
            ("IMAP_USERNAME", "me@example.com"),
            ("IMAP_PASSWORD", "secret"),
            ("IMAP_HOST", "imap.example.com"),
            ("IMAP_PORT", "993"),
        ]))
        .unwrap();
        assert_eq!(settings.host, "imap.example.com");
        assert_eq!(settings.port, 993);
        assert_eq!(settings.username, "me@example.com");
    }

    #[test]
    fn test_imap_env_reports_every_missing_var() {
        let err = ImapSettings::from_lookup(lookup(&[("IMAP_HOST", "imap.example.com")]))
            .unwrap_err();
        match err {
            ConfigError::MissingEnv(vars) => {
                assert_eq!(vars, vec!["IMAP_USERNAME", "IMAP_PASSWORD", "IMAP_PORT"])
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bad_port() {
        let err = ImapSettings::from_lookup(lookup(&[
            ("IMAP_USERNAME", "me"),
            ("IMAP_PASSWORD", "pw"),
            ("IMAP_HOST", "h"),
            ("IMAP_PORT", "imaps"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("IMAP_PORT"));
    }

    #[test]
    fn test_smtp_from_defaults_to_username() {
        let settings = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "465"),
            ("SMTP_USERNAME", "me@example.com"),
            ("SMTP_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert_eq!(settings.from, "me@example.com");

        let settings = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USERNAME", "me@example.com"),
            ("SMTP_PASSWORD", "pw"),
            ("FROM_EMAIL", "Me <me@example.org>"),
        ]))
        .unwrap();
        assert_eq!(settings.from, "Me <me@example.org>");
        assert_eq!(settings.port, 587);
    }
}
