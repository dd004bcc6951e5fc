//! Text formatting for the list and detail screens. Stateless.

use crate::mailbox::Message;
use crate::mime::MessageBody;
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const WRAP_WIDTH: usize = 80;
pub const LOADING_BODY: &str = "Loading message content...";
pub const EMPTY_BODY: &str = "(no content)";
const TITLE_WIDTH: usize = 60;
const RULE_WIDTH: usize = 60;

/// Compile `pattern` into `cell` on first use. A pattern that fails to
/// compile is logged once and yields `None` from then on.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Option<Regex>>,
    pattern: &str,
) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, "regex failed to compile: {}", e);
            None
        }
    })
    .as_ref()
}

fn trailing_blanks() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"[ \t]+\n")
}

fn blank_runs() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached_regex(&RE, r"\n{4,}")
}

fn replace_all(re: Option<&Regex>, text: String, with: &str) -> String {
    match re {
        Some(re) => re.replace_all(&text, with).into_owned(),
        None => text,
    }
}

/// Normalise line endings, strip trailing blanks, allow at most two
/// consecutive empty lines, and trim.
pub fn cleanup_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = format!("{}\n", text);
    let text = replace_all(trailing_blanks(), text, "\n");
    let text = replace_all(blank_runs(), text, "\n\n\n");
    text.trim().to_string()
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width || width == 0 {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            out.push(word.drain(..width).collect());
        }
        let word_len = word.len();
        if current_len > 0 && current_len + 1 + word_len > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word);
        current_len += word_len;
    }
    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
    out
}

pub fn format_date_long(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date
            .with_timezone(&Local)
            .format("%A, %B %-d, %Y at %-I:%M %p")
            .to_string(),
        None => "(unknown date)".to_string(),
    }
}

pub fn format_date_short(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => date.with_timezone(&Local).format("%b %-d, %H:%M").to_string(),
        None => String::new(),
    }
}

/// Truncate to `max` chars, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

/// One list row: unread marker, date, sender, subject.
pub fn list_row(message: &Message, width: usize) -> String {
    let marker = if message.seen { ' ' } else { '*' };
    let date = format_date_short(message.date);
    let from_width = 20.min(width.saturating_sub(20));
    let subj_width = width.saturating_sub(20 + from_width).min(TITLE_WIDTH);
    format!(
        " {} {:<13} {:<from_w$} {}",
        marker,
        date,
        truncate(&message.from, from_width),
        truncate(&message.subject, subj_width),
        from_w = from_width
    )
}

/// Body text for display. HTML-only bodies are converted to text; if that
/// fails the markup is shown as-is.
fn body_text(body: &MessageBody) -> String {
    if body.is_html_only() {
        match html2text::from_read(body.html.as_bytes(), WRAP_WIDTH) {
            Ok(text) => return text,
            Err(e) => debug!("html conversion failed, showing raw body: {}", e),
        }
    }
    body.merged.clone()
}

/// Full detail-screen text for `message`, one entry per line.
pub fn render_message(message: &Message) -> Vec<String> {
    let mut lines = vec![message.subject.clone(), String::new()];
    lines.push(format!("From: {}", message.from));
    if !message.to.is_empty() {
        lines.push(format!("To: {}", message.to));
    }
    lines.push(format!("Date: {}", format_date_long(message.date)));
    lines.push(String::new());
    lines.push("\u{2500}".repeat(RULE_WIDTH));
    lines.push(String::new());

    let body = match &message.body {
        None => LOADING_BODY.to_string(),
        Some(body) => {
            let text = cleanup_whitespace(&body_text(body));
            if text.is_empty() {
                EMPTY_BODY.to_string()
            } else {
                text
            }
        }
    };
    for line in body.lines() {
        lines.extend(wrap(line, WRAP_WIDTH));
    }
    lines
}
