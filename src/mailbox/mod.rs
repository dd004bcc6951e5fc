//! Local model of the remote mailbox.

pub mod body;
pub mod index;
pub mod trash;

use crate::mime::{self, MessageBody};
use crate::session::{HeaderRecord, Uid};
use chrono::{DateTime, Utc};

pub const NO_SUBJECT: &str = "(No Subject)";
pub const UNKNOWN_SENDER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub uid: Uid,
    /// Never empty; [`NO_SUBJECT`] stands in for a missing subject.
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: Option<DateTime<Utc>>,
    pub seen: bool,
    /// Absent until fetched, then never replaced.
    pub body: Option<MessageBody>,
}

impl Message {
    pub fn from_header(header: HeaderRecord) -> Self {
        let subject = header
            .subject
            .as_deref()
            .map(mime::decode_words)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUBJECT.to_string());
        let from = header
            .from
            .as_deref()
            .map(mime::decode_words)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let to = header
            .to
            .as_deref()
            .map(mime::decode_words)
            .unwrap_or_default();

        Message {
            uid: header.uid,
            subject,
            from,
            to,
            date: header.date.as_deref().and_then(mime::parse_date),
            seen: header.seen,
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_placeholders() {
        let msg = Message::from_header(HeaderRecord {
            uid: 9,
            subject: Some("   ".to_string()),
            ..HeaderRecord::default()
        });
        assert_eq!(msg.subject, NO_SUBJECT);
        assert_eq!(msg.from, UNKNOWN_SENDER);
        assert_eq!(msg.to, "");
        assert!(msg.date.is_none());
        assert!(msg.body.is_none());
    }

    #[test]
    fn test_from_header_decodes_fields() {
        let msg = Message::from_header(HeaderRecord {
            uid: 3,
            subject: Some("=?UTF-8?Q?Caf=C3=A9?=".to_string()),
            from: Some("Alice".to_string()),
            to: Some("bob@example.com".to_string()),
            date: Some("Tue, 2 Jan 2024 15:04:05 +0000".to_string()),
            seen: true,
        });
        assert_eq!(msg.subject, "Caf\u{e9}");
        assert_eq!(msg.from, "Alice");
        assert_eq!(msg.to, "bob@example.com");
        assert!(msg.date.is_some());
        assert!(msg.seen);
    }
}
