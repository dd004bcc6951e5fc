use crate::render::cached_regex;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("draft file error: {0}")]
    Io(#[from] io::Error),
    #[error("editor '{0}' exited unsuccessfully")]
    Editor(String),
    #[error("unrecognised draft header: {0}")]
    MalformedHeader(String),
    #[error("recipient is required")]
    MissingRecipient,
    #[error("invalid email format: {0}")]
    InvalidRecipient(String),
    #[error("subject is required")]
    MissingSubject,
    #[error("email body is required")]
    MissingBody,
    #[error("priority must be normal, high or low, got '{0}'")]
    InvalidPriority(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Priority {
    #[default]
    Normal,
    High,
    Low,
}

impl Priority {
    /// Value of the `X-Priority` header.
    pub fn x_priority(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Normal => 3,
            Priority::Low => 5,
        }
    }

    /// Value of the `Importance` header.
    pub fn importance(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Normal => "Normal",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            _ => Err(ComposeError::InvalidPriority(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Low => "low",
        })
    }
}

/// A validated outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub priority: Priority,
}

impl Draft {
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Summary shown before the user confirms sending.
    pub fn summary(&self, from: &str) -> String {
        let mut out = format!("From: {}\nTo: {}\n", from, self.to.join(", "));
        if !self.cc.is_empty() {
            out.push_str(&format!("Cc: {}\n", self.cc.join(", ")));
        }
        if !self.bcc.is_empty() {
            out.push_str(&format!("Bcc: {}\n", self.bcc.join(", ")));
        }
        out.push_str(&format!(
            "Subject: {}\nPriority: {}\n",
            self.subject, self.priority
        ));
        out
    }
}

/// Build a blank compose draft template.
pub fn build_compose_draft(from: &str) -> String {
    format!(
        "From: {}\nTo: \nCc: \nBcc: \nSubject: \nPriority: normal\n\n",
        from
    )
}

fn header_line() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"^([A-Za-z-]+):\s*(.*)$")
}

/// Split a comma separated address list, dropping empty entries.
pub fn parse_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_recipients(list: &[String]) -> Result<(), ComposeError> {
    match list.iter().find(|r| !r.contains('@') || !r.contains('.')) {
        Some(bad) => Err(ComposeError::InvalidRecipient(bad.clone())),
        None => Ok(()),
    }
}

/// Parse an edited draft: headers, a blank line, then the body. The From
/// header is informational; the sender always comes from the settings.
pub fn parse_draft(text: &str) -> Result<Draft, ComposeError> {
    let text = text.replace("\r\n", "\n");
    let (headers, body) = match text.split_once("\n\n") {
        Some((headers, body)) => (headers, body),
        None => (text.as_str(), ""),
    };

    let mut to = Vec::new();
    let mut cc = Vec::new();
    let mut bcc = Vec::new();
    let mut subject = String::new();
    let mut priority = Priority::Normal;

    for line in headers.lines().filter(|l| !l.trim().is_empty()) {
        let caps = header_line()
            .and_then(|re| re.captures(line))
            .ok_or_else(|| ComposeError::MalformedHeader(line.to_string()))?;
        let value = caps[2].trim();
        match caps[1].to_ascii_lowercase().as_str() {
            "from" => {}
            "to" => to = parse_recipients(value),
            "cc" => cc = parse_recipients(value),
            "bcc" => bcc = parse_recipients(value),
            "subject" => subject = value.to_string(),
            "priority" => priority = value.parse()?,
            _ => return Err(ComposeError::MalformedHeader(line.to_string())),
        }
    }

    if to.is_empty() {
        return Err(ComposeError::MissingRecipient);
    }
    validate_recipients(&to)?;
    validate_recipients(&cc)?;
    validate_recipients(&bcc)?;
    if subject.is_empty() {
        return Err(ComposeError::MissingSubject);
    }
    let body = body.trim_end().to_string();
    if body.trim().is_empty() {
        return Err(ComposeError::MissingBody);
    }

    Ok(Draft {
        to,
        cc,
        bcc,
        subject,
        body,
        priority,
    })
}

/// Write content to a temp file with restrictive permissions (0600).
pub fn write_temp_file(content: &str) -> io::Result<PathBuf> {
    let dir = std::env::temp_dir();
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let filename = format!(
        "cleu-draft-{}-{}.eml",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    );
    let path = dir.join(filename);

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&path)?;

    io::Write::write_all(&mut file, content.as_bytes())?;
    Ok(path)
}

/// Open `draft` in the editor and return the edited text. The temp file is
/// removed afterwards.
pub fn edit_draft(draft: &str, editor_cmd: &str) -> Result<String, ComposeError> {
    let path = write_temp_file(draft)?;
    debug!(path = %path.display(), editor = editor_cmd, "opening editor");

    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{} \"$1\"", editor_cmd))
        .arg("sh")
        .arg(&path)
        .status();

    let result = match status {
        Ok(s) if s.success() => fs::read_to_string(&path).map_err(ComposeError::from),
        Ok(_) => Err(ComposeError::Editor(editor_cmd.to_string())),
        Err(e) => Err(ComposeError::Io(e)),
    };
    let _ = fs::remove_file(&path);
    result
}
