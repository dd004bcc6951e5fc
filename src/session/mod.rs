//! The mail session seam.
//!
//! Everything the client needs from the remote mailbox goes through
//! [`MailSession`]. The worker thread owns exactly one implementation for the
//! lifetime of the process; nothing else talks to the server.

pub mod imap_session;
#[cfg(test)]
pub mod mock;

use std::fmt;
use thiserror::Error;

/// Session-assigned unique id. Stable across renumbering, unlike sequence
/// numbers.
pub type Uid = u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("message {0} not found")]
    NotFound(Uid),
}

impl SessionError {
    /// Auth and connection failures end the program; everything else is an
    /// in-session failure the user can still look at.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Auth(_) | SessionError::Connection(_))
    }
}

/// Inclusive range of sequence numbers, `start <= end`, both >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqRange {
    pub start: u32,
    pub end: u32,
}

impl SeqRange {
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl fmt::Display for SeqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxInfo {
    pub message_count: u32,
}

/// Envelope data for one message as the server reported it. Strings are
/// undecoded (they may still carry RFC 2047 encoded words).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    pub uid: Uid,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
    pub seen: bool,
}

/// How far an expunge reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpungeScope {
    /// Only the requested uid was removed.
    Message,
    /// Every message flagged deleted in the mailbox was removed.
    Mailbox,
}

pub trait MailSession {
    fn select_mailbox(&mut self, name: &str) -> Result<MailboxInfo, SessionError>;

    fn fetch_headers(&mut self, range: SeqRange) -> Result<Vec<HeaderRecord>, SessionError>;

    /// Raw RFC 5322 bytes of the message in the selected mailbox.
    fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, SessionError>;

    fn folder_exists(&mut self, name: &str) -> Result<bool, SessionError>;

    /// Move a message from the selected mailbox into `folder`.
    fn move_message(&mut self, uid: Uid, folder: &str) -> Result<(), SessionError>;

    fn flag_deleted(&mut self, uid: Uid) -> Result<(), SessionError>;

    /// Remove `uid` if it is flagged deleted. Servers without per-uid
    /// expunge remove every flagged message instead; the returned scope says
    /// which happened.
    fn expunge(&mut self, uid: Uid) -> Result<ExpungeScope, SessionError>;

    fn logout(&mut self) -> Result<(), SessionError>;
}
