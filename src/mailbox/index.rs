//! Paginated message index.
//!
//! Pages are taken from the newest end of the mailbox: page 1 holds the most
//! recent `size` messages, page 2 the `size` before those, and so on until
//! sequence number 1.

use super::Message;
use crate::mime::MessageBody;
use crate::session::{MailSession, SeqRange, SessionError, Uid};
use std::collections::HashSet;
use tracing::debug;

/// Sequence range of page `page` (1-based) in a mailbox of `total` messages.
pub fn page_range(total: u32, page: u32, size: u32) -> Option<SeqRange> {
    if page == 0 {
        return None;
    }
    window(total, (page - 1).saturating_mul(size), size)
}

/// Up to `size` messages ending `skip` messages below the newest one.
pub fn window(total: u32, skip: u32, size: u32) -> Option<SeqRange> {
    if size == 0 || skip >= total {
        return None;
    }
    let end = total - skip;
    let start = end.saturating_sub(size) + 1;
    Some(SeqRange { start, end })
}

/// Which slice of the mailbox to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Page `n` (1-based) counted from the newest message.
    Page(u32),
    /// The messages just below the `n` newest, as many as a page holds.
    /// Continues a listing without gaps even after messages were removed.
    After(u32),
}

impl PageRequest {
    fn range(self, total: u32, size: u32) -> Option<SeqRange> {
        match self {
            PageRequest::Page(page) => page_range(total, page, size),
            PageRequest::After(loaded) => window(total, loaded, size),
        }
    }
}

/// One batch of headers, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub messages: Vec<Message>,
    pub total: u32,
}

/// Select `mailbox` and fetch the headers `request` names. Bodies are left
/// unfetched.
pub fn fetch_page<S: MailSession + ?Sized>(
    session: &mut S,
    mailbox: &str,
    request: PageRequest,
    size: u32,
) -> Result<Page, SessionError> {
    let info = session.select_mailbox(mailbox)?;
    let total = info.message_count;

    let Some(range) = request.range(total, size) else {
        debug!(total, ?request, "nothing left to fetch");
        return Ok(Page {
            messages: Vec::new(),
            total,
        });
    };

    let mut messages: Vec<Message> = session
        .fetch_headers(range)?
        .into_iter()
        .map(Message::from_header)
        .collect();
    // Stable, so equal dates keep server order.
    messages.sort_by(|a, b| b.date.cmp(&a.date));

    debug!(%range, requested = range.len(), fetched = messages.len(), total, "page fetched");
    Ok(Page { messages, total })
}

#[derive(Debug, Default)]
pub struct MessageIndex {
    messages: Vec<Message>,
    total: u32,
    /// An append brought nothing new: mail arrived above the loaded range,
    /// so further windows would only repeat what is already held.
    exhausted: bool,
}

impl MessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index with `page`, or append it. Appended messages whose
    /// uid is already present are dropped. Returns how many messages were
    /// added.
    pub fn apply_page(&mut self, page: Page, append: bool) -> usize {
        self.total = page.total;
        if append {
            let known: HashSet<Uid> = self.messages.iter().map(|m| m.uid).collect();
            let before = self.messages.len();
            self.messages
                .extend(page.messages.into_iter().filter(|m| !known.contains(&m.uid)));
            let added = self.messages.len() - before;
            if added == 0 {
                self.exhausted = true;
            }
            added
        } else {
            self.exhausted = false;
            self.messages = page.messages;
            self.messages.len()
        }
    }

    /// Set the body of `uid` if it has none yet. Returns whether anything
    /// changed.
    pub fn merge_body(&mut self, uid: Uid, body: MessageBody) -> bool {
        match self.messages.iter_mut().find(|m| m.uid == uid) {
            Some(message) if message.body.is_none() => {
                message.body = Some(body);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, uid: Uid) -> Option<Message> {
        let pos = self.messages.iter().position(|m| m.uid == uid)?;
        self.total = self.total.saturating_sub(1);
        Some(self.messages.remove(pos))
    }

    pub fn more_available(&self) -> bool {
        !self.exhausted && (self.messages.len() as u64) < u64::from(self.total)
    }

    /// True when the mailbox holds messages that "load more" cannot reach
    /// and only a refresh will show.
    pub fn needs_refresh(&self) -> bool {
        self.exhausted && (self.messages.len() as u64) < u64::from(self.total)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Message> {
        self.messages.get(idx)
    }

    pub fn find(&self, uid: Uid) -> Option<&Message> {
        self.messages.iter().find(|m| m.uid == uid)
    }
}
