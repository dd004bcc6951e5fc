use super::{ExpungeScope, HeaderRecord, MailSession, MailboxInfo, SeqRange, SessionError, Uid};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// In-memory mailbox. Position in `messages` is the sequence number minus one.
pub struct MockSession {
    pub messages: Vec<(HeaderRecord, Vec<u8>)>,
    pub folders: Vec<String>,
    pub fail_moves: bool,
    pub fail_store: bool,
    pub uidplus: bool,
    pub fail_fetch: Option<SessionError>,
    pub flagged: HashSet<Uid>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

fn entry(uid: Uid) -> (HeaderRecord, Vec<u8>) {
    let header = HeaderRecord {
        uid,
        subject: Some(format!("Message {}", uid)),
        from: Some("Alice".to_string()),
        to: Some("bob@example.com".to_string()),
        date: Some(format!(
            "Mon, 1 Jan 2024 {:02}:{:02}:00 +0000",
            uid / 60 % 24,
            uid % 60
        )),
        seen: uid % 2 == 0,
    };
    let raw = format!(
        "Subject: Message {}\r\nContent-Type: text/plain\r\n\r\nBody {}\r\n",
        uid, uid
    );
    (header, raw.into_bytes())
}

impl MockSession {
    /// `count` messages with uids `1..=count`, dated one minute apart so
    /// higher uids are newer.
    pub fn with_messages(count: u32) -> Self {
        let messages = (1..=count).map(entry).collect();
        MockSession {
            messages,
            folders: vec!["INBOX".to_string(), "Trash".to_string()],
            fail_moves: false,
            fail_store: false,
            uidplus: true,
            fail_fetch: None,
            flagged: HashSet::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Deliver a new message at the top of the mailbox.
    pub fn push_message(&mut self, uid: Uid) {
        self.messages.push(entry(uid));
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn position(&self, uid: Uid) -> Option<usize> {
        self.messages.iter().position(|(h, _)| h.uid == uid)
    }
}

impl MailSession for MockSession {
    fn select_mailbox(&mut self, name: &str) -> Result<MailboxInfo, SessionError> {
        self.record(format!("select {}", name));
        Ok(MailboxInfo {
            message_count: self.messages.len() as u32,
        })
    }

    fn fetch_headers(&mut self, range: SeqRange) -> Result<Vec<HeaderRecord>, SessionError> {
        self.record(format!("fetch {}", range));
        if let Some(err) = self.fail_fetch.clone() {
            return Err(err);
        }
        let start = range.start as usize - 1;
        let end = (range.end as usize).min(self.messages.len());
        Ok(self.messages[start..end]
            .iter()
            .map(|(h, _)| h.clone())
            .collect())
    }

    fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, SessionError> {
        self.record(format!("body {}", uid));
        if let Some(err) = self.fail_fetch.clone() {
            return Err(err);
        }
        self.position(uid)
            .map(|pos| self.messages[pos].1.clone())
            .ok_or(SessionError::NotFound(uid))
    }

    fn folder_exists(&mut self, name: &str) -> Result<bool, SessionError> {
        self.record(format!("exists {}", name));
        Ok(self.folders.iter().any(|f| f == name))
    }

    fn move_message(&mut self, uid: Uid, folder: &str) -> Result<(), SessionError> {
        self.record(format!("move {} {}", uid, folder));
        if self.fail_moves {
            return Err(SessionError::Protocol("NO [CANNOT] move refused".to_string()));
        }
        let pos = self.position(uid).ok_or(SessionError::NotFound(uid))?;
        self.messages.remove(pos);
        Ok(())
    }

    fn flag_deleted(&mut self, uid: Uid) -> Result<(), SessionError> {
        self.record(format!("flag {}", uid));
        if self.fail_store {
            return Err(SessionError::Protocol("NO STORE failed".to_string()));
        }
        self.position(uid).ok_or(SessionError::NotFound(uid))?;
        self.flagged.insert(uid);
        Ok(())
    }

    fn expunge(&mut self, uid: Uid) -> Result<ExpungeScope, SessionError> {
        self.record(format!("expunge {}", uid));
        if self.uidplus {
            if self.flagged.remove(&uid) {
                if let Some(pos) = self.position(uid) {
                    self.messages.remove(pos);
                }
            }
            Ok(ExpungeScope::Message)
        } else {
            let flagged = std::mem::take(&mut self.flagged);
            self.messages.retain(|(h, _)| !flagged.contains(&h.uid));
            Ok(ExpungeScope::Mailbox)
        }
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.record("logout".to_string());
        Ok(())
    }
}
