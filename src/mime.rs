//! Message body decoding and header text helpers.

use chrono::{DateTime, Utc};
use mailparse::{DispositionType, ParsedMail};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Parse(#[from] mailparse::MailParseError),
    #[error("message has no headers")]
    NoHeaders,
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("multipart message without a boundary")]
    MissingBoundary,
}

/// Decoded body of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    /// Declared type of the whole message, e.g. `multipart/alternative`.
    pub content_type: String,
    pub plain_text: String,
    pub html: String,
    /// `plain_text` if non-empty, else `html`.
    pub merged: String,
}

impl MessageBody {
    /// Raw bytes shown as-is when the message cannot be decoded.
    pub fn raw_text(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw).into_owned();
        MessageBody {
            content_type: "text/plain".to_string(),
            plain_text: text.clone(),
            html: String::new(),
            merged: text,
        }
    }

    pub fn is_html_only(&self) -> bool {
        self.plain_text.is_empty() && !self.html.is_empty()
    }
}

/// Decode a full message. Within a multipart tree the last `text/plain` and
/// the last `text/html` part win; attachments are skipped.
pub fn decode(raw: &[u8]) -> Result<MessageBody, DecodeError> {
    check_header_block(raw)?;
    let parsed = mailparse::parse_mail(raw)?;
    if parsed.headers.is_empty() {
        return Err(DecodeError::NoHeaders);
    }

    let content_type = parsed.ctype.mimetype.to_ascii_lowercase();
    let mut body = MessageBody {
        content_type: content_type.clone(),
        ..MessageBody::default()
    };

    if content_type.starts_with("multipart/") {
        if !parsed.ctype.params.contains_key("boundary") {
            return Err(DecodeError::MissingBoundary);
        }
        collect_parts(&parsed, &mut body);
    } else {
        let text = part_text(&parsed)?;
        if content_type.starts_with("text/html") {
            body.html = text;
        } else {
            body.plain_text = text;
        }
    }

    body.merged = if !body.plain_text.is_empty() {
        body.plain_text.clone()
    } else {
        body.html.clone()
    };
    Ok(body)
}

/// Like [`decode`], but never fails: undecodable input becomes plain text.
pub fn decode_or_raw(raw: &[u8]) -> MessageBody {
    match decode(raw) {
        Ok(body) => body,
        Err(e) => {
            debug!("falling back to raw text: {}", e);
            MessageBody::raw_text(raw)
        }
    }
}

/// Every line up to the first blank one must be `name: value` or a folded
/// continuation. The parser is more forgiving and would swallow text lines
/// as valueless headers.
fn check_header_block(raw: &[u8]) -> Result<(), DecodeError> {
    for (i, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break;
        }
        let malformed = || DecodeError::MalformedHeader(String::from_utf8_lossy(line).into_owned());
        if matches!(line[0], b' ' | b'\t') {
            if i == 0 {
                return Err(malformed());
            }
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(malformed());
        };
        let name = &line[..colon];
        // Printable ASCII, no spaces
        if name.is_empty() || !name.iter().all(|b| (33..=126).contains(b)) {
            return Err(malformed());
        }
    }
    Ok(())
}

fn collect_parts(part: &ParsedMail, body: &mut MessageBody) {
    for sub in &part.subparts {
        let mimetype = sub.ctype.mimetype.to_ascii_lowercase();
        if mimetype.starts_with("multipart/") {
            collect_parts(sub, body);
            continue;
        }
        if sub.get_content_disposition().disposition == DispositionType::Attachment {
            continue;
        }
        let text = match part_text(sub) {
            Ok(text) => text,
            Err(e) => {
                debug!(mimetype, "skipping undecodable part: {}", e);
                continue;
            }
        };
        if mimetype.starts_with("text/html") {
            body.html = text;
        } else if mimetype.starts_with("text/plain") {
            body.plain_text = text;
        }
    }
}

fn part_text(part: &ParsedMail) -> Result<String, DecodeError> {
    let text = part.get_body()?;
    Ok(text.trim_end_matches(|c| c == '\r' || c == '\n').to_string())
}

/// Decode RFC 2047 encoded words in a header value.
pub fn decode_words(raw: &str) -> String {
    let line = format!("X: {}", raw);
    match mailparse::parse_header(line.as_bytes()) {
        Ok((header, _)) => header.get_value(),
        Err(_) => raw.to_string(),
    }
}

/// Parse a Date header, strictly first and then leniently.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            mailparse::dateparse(raw)
                .ok()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
        })
}
