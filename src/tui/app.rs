//! The mailbox browser state machine.
//!
//! `App` owns the message index and the current screen. Keys and backend
//! responses are applied here, one at a time, on the UI thread; anything
//! that needs the network is sent to the backend as a [`BackendCommand`].

use super::input::Key;
use crate::backend::{BackendCommand, BackendResponse};
use crate::mailbox::index::MessageIndex;
use crate::mailbox::Message;
use crate::render;
use crate::session::Uid;
use std::collections::HashSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PAGE_JUMP: usize = 20;
const REFRESH_HINT: &str = "New mail arrived; press r to refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    No,
    Yes,
}

impl Choice {
    fn toggle(self) -> Self {
        match self {
            Choice::No => Choice::Yes,
            Choice::Yes => Choice::No,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirm {
    /// Snapshot taken when the prompt opened.
    pub target: Message,
    pub choice: Choice,
    /// Set once the delete was issued; the prompt then ignores input.
    pub deleting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Detail {
        uid: Uid,
        lines: Vec<String>,
        scroll: usize,
    },
    ConfirmDelete(DeleteConfirm),
}

/// A row of the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListItem<'a> {
    Message(&'a Message),
    LoadMore,
}

/// Subject search over the loaded messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub query: String,
    /// Keys go to the query until Enter or Escape.
    pub editing: bool,
}

impl Filter {
    fn matches(&self, message: &Message) -> bool {
        self.query.is_empty()
            || message
                .subject
                .to_lowercase()
                .contains(&self.query.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Full-screen error. Fatal ones end the program on the next key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub fatal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub expires: Instant,
}

pub struct App {
    cmd_tx: mpsc::Sender<BackendCommand>,
    mailbox: String,
    index: MessageIndex,
    mode: Mode,
    cursor: usize,
    page: u32,
    loading: bool,
    loading_more: bool,
    pending_bodies: HashSet<Uid>,
    filter: Option<Filter>,
    failure: Option<Failure>,
    error_banner: Option<String>,
    banner: Option<Banner>,
    banner_duration: Duration,
}

impl App {
    pub fn new(
        cmd_tx: mpsc::Sender<BackendCommand>,
        mailbox: String,
        banner_duration: Duration,
    ) -> Self {
        App {
            cmd_tx,
            mailbox,
            index: MessageIndex::new(),
            mode: Mode::List,
            cursor: 0,
            page: 1,
            loading: true,
            loading_more: false,
            pending_bodies: HashSet::new(),
            filter: None,
            failure: None,
            error_banner: None,
            banner: None,
            banner_duration,
        }
    }

    /// Request the first page.
    pub fn start(&mut self) {
        self.loading = true;
        self.page = 1;
        self.send(BackendCommand::LoadPage {
            page: 1,
            append: false,
            loaded: 0,
        });
    }

    fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            warn!("backend is gone, command dropped");
        }
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    pub fn index(&self) -> &MessageIndex {
        &self.index
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// The error that ends the session, once one has happened.
    pub fn fatal_failure(&self) -> Option<&Failure> {
        self.failure.as_ref().filter(|f| f.fatal)
    }

    pub fn error_banner(&self) -> Option<&str> {
        self.error_banner.as_deref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    fn is_filter_editing(&self) -> bool {
        self.filter.as_ref().is_some_and(|f| f.editing)
    }

    /// Rows of the list screen: the messages passing the filter, then the
    /// "load more" row while older messages remain.
    pub fn rows(&self) -> Vec<ListItem<'_>> {
        let mut rows: Vec<ListItem<'_>> = self
            .index
            .iter()
            .filter(|m| self.filter.as_ref().map_or(true, |f| f.matches(m)))
            .map(ListItem::Message)
            .collect();
        if self.index.more_available() {
            rows.push(ListItem::LoadMore);
        }
        rows
    }

    pub fn item_count(&self) -> usize {
        self.rows().len()
    }

    pub fn item(&self, idx: usize) -> Option<ListItem<'_>> {
        self.rows().get(idx).copied()
    }

    fn selected_uid(&self) -> Option<Uid> {
        match self.item(self.cursor) {
            Some(ListItem::Message(message)) => Some(message.uid),
            _ => None,
        }
    }

    /// Put the cursor back on `uid` after the rows changed, or on the first
    /// row if it is no longer shown.
    fn select_uid(&mut self, uid: Option<Uid>) {
        let pos = uid.and_then(|uid| {
            self.rows()
                .iter()
                .position(|row| matches!(row, ListItem::Message(m) if m.uid == uid))
        });
        self.cursor = pos.unwrap_or(0);
        self.clamp_cursor();
    }

    /// The message the user is looking at: the detail message, or the list
    /// selection.
    fn current_message(&self) -> Option<&Message> {
        match &self.mode {
            Mode::Detail { uid, .. } => self.index.find(*uid),
            _ => match self.item(self.cursor) {
                Some(ListItem::Message(message)) => Some(message),
                _ => None,
            },
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Action {
        // While typing a search, 'q' is part of the query.
        let typing = self.failure.is_none()
            && self.mode == Mode::List
            && self.is_filter_editing();
        if matches!(key, Key::Ctrl('c')) || (key == Key::Char('q') && !typing) {
            self.send(BackendCommand::Shutdown);
            return Action::Quit;
        }

        if let Some(failure) = &self.failure {
            if failure.fatal {
                self.send(BackendCommand::Shutdown);
                return Action::Quit;
            }
            return Action::Continue;
        }

        self.error_banner = None;

        match self.mode {
            Mode::List if typing => self.handle_filter_key(key),
            Mode::List => self.handle_list_key(key),
            Mode::Detail { .. } => self.handle_detail_key(key),
            Mode::ConfirmDelete(_) => self.handle_confirm_key(key),
        }
        Action::Continue
    }

    fn handle_list_key(&mut self, key: Key) {
        let count = self.item_count();
        match key {
            Key::Char('j') | Key::Down => {
                if self.cursor + 1 < count {
                    self.cursor += 1;
                }
            }
            Key::Char('k') | Key::Up => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            Key::PageDown => {
                if count > 0 {
                    self.cursor = (self.cursor + PAGE_JUMP).min(count - 1);
                }
            }
            Key::PageUp => {
                self.cursor = self.cursor.saturating_sub(PAGE_JUMP);
            }
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = count.saturating_sub(1),
            Key::Enter => match self.item(self.cursor) {
                Some(ListItem::LoadMore) => self.load_more(),
                Some(ListItem::Message(message)) => {
                    let message = message.clone();
                    self.open_detail(&message);
                }
                None => {}
            },
            Key::Char('d') | Key::Delete => self.begin_delete(),
            Key::Char('r') => self.refresh(),
            Key::Char('/') => {
                let filter = self.filter.get_or_insert_with(Filter::default);
                filter.editing = true;
            }
            Key::Escape if self.filter.is_some() => {
                let selected = self.selected_uid();
                self.filter = None;
                self.select_uid(selected);
            }
            _ => {}
        }
    }

    fn handle_filter_key(&mut self, key: Key) {
        if matches!(key, Key::Up | Key::Down) {
            return self.handle_list_key(key);
        }
        let selected = self.selected_uid();
        let Some(filter) = self.filter.as_mut() else {
            return;
        };
        let clear = match key {
            Key::Char(c) => {
                filter.query.push(c);
                false
            }
            Key::Backspace => {
                filter.query.pop();
                false
            }
            Key::Enter => {
                filter.editing = false;
                filter.query.is_empty()
            }
            Key::Escape => true,
            _ => false,
        };
        if clear {
            self.filter = None;
        }
        self.select_uid(selected);
    }

    fn load_more(&mut self) {
        if self.loading_more || self.loading {
            return;
        }
        self.loading_more = true;
        self.page += 1;
        self.send(BackendCommand::LoadPage {
            page: self.page,
            append: true,
            loaded: self.index.len() as u32,
        });
    }

    fn refresh(&mut self) {
        if self.loading || self.loading_more {
            return;
        }
        self.loading = true;
        self.page = 1;
        self.send(BackendCommand::LoadPage {
            page: 1,
            append: false,
            loaded: 0,
        });
    }

    fn open_detail(&mut self, message: &Message) {
        self.mode = Mode::Detail {
            uid: message.uid,
            lines: render::render_message(message),
            scroll: 0,
        };
        if message.body.is_none() && self.pending_bodies.insert(message.uid) {
            self.send(BackendCommand::LoadBody { uid: message.uid });
        }
    }

    fn handle_detail_key(&mut self, key: Key) {
        match key {
            Key::Char('d') | Key::Delete => return self.begin_delete(),
            Key::Escape | Key::Backspace => {
                self.mode = Mode::List;
                return;
            }
            _ => {}
        }
        let Mode::Detail { lines, scroll, .. } = &mut self.mode else {
            return;
        };
        let last = lines.len().saturating_sub(1);
        match key {
            Key::Char('j') | Key::Down => *scroll = (*scroll + 1).min(last),
            Key::Char('k') | Key::Up => *scroll = scroll.saturating_sub(1),
            Key::PageDown | Key::Char(' ') => *scroll = (*scroll + PAGE_JUMP).min(last),
            Key::PageUp => *scroll = scroll.saturating_sub(PAGE_JUMP),
            Key::Home => *scroll = 0,
            Key::End => *scroll = last,
            _ => {}
        }
    }

    fn begin_delete(&mut self) {
        let Some(target) = self.current_message().cloned() else {
            return;
        };
        self.mode = Mode::ConfirmDelete(DeleteConfirm {
            target,
            choice: Choice::No,
            deleting: false,
        });
    }

    fn handle_confirm_key(&mut self, key: Key) {
        let Mode::ConfirmDelete(confirm) = &mut self.mode else {
            return;
        };
        if confirm.deleting {
            return;
        }
        let delete_uid = match key {
            Key::Left | Key::Right | Key::Tab | Key::Char('h') | Key::Char('l') => {
                confirm.choice = confirm.choice.toggle();
                return;
            }
            Key::Enter if confirm.choice == Choice::Yes => {
                confirm.deleting = true;
                confirm.target.uid
            }
            Key::Enter | Key::Escape | Key::Backspace | Key::Char('n') => {
                self.mode = Mode::List;
                return;
            }
            _ => return,
        };
        self.send(BackendCommand::Delete { uid: delete_uid });
    }

    /// Apply one backend response. Returns true if the screen changed.
    pub fn apply(&mut self, response: BackendResponse, now: Instant) -> bool {
        match response {
            BackendResponse::Connected(Ok(())) => false,
            BackendResponse::Connected(Err(e)) => {
                self.loading = false;
                self.failure = Some(Failure {
                    message: format!("Could not connect: {}", e),
                    fatal: true,
                });
                true
            }
            BackendResponse::PageLoaded {
                page,
                append,
                result,
            } => {
                self.loading = false;
                self.loading_more = false;
                match result {
                    Ok(batch) => {
                        debug!(page, append, fetched = batch.messages.len(), "applying page");
                        let added = self.index.apply_page(batch, append);
                        if !append {
                            self.cursor = 0;
                        } else if added == 0 && self.index.needs_refresh() {
                            debug!(total = self.index.total(), "load more reached nothing new");
                            self.page = self.page.saturating_sub(1).max(1);
                            self.banner = Some(Banner {
                                text: REFRESH_HINT.to_string(),
                                expires: now + self.banner_duration,
                            });
                        }
                        self.clamp_cursor();
                    }
                    Err(e) => {
                        if append {
                            self.page = self.page.saturating_sub(1).max(1);
                        }
                        self.failure = Some(Failure {
                            message: format!("Failed to load messages: {}", e),
                            fatal: e.is_fatal(),
                        });
                    }
                }
                true
            }
            BackendResponse::BodyLoaded { uid, result } => {
                self.pending_bodies.remove(&uid);
                match result {
                    Ok(body) => {
                        self.index.merge_body(uid, body);
                        self.refresh_detail(uid)
                    }
                    Err(e) => {
                        self.failure = Some(Failure {
                            message: format!("Failed to load message: {}", e),
                            fatal: e.is_fatal(),
                        });
                        true
                    }
                }
            }
            BackendResponse::DeleteCompleted { uid, outcome } => {
                self.mode = Mode::List;
                if outcome.success {
                    self.index.remove(uid);
                    self.clamp_cursor();
                    self.banner = Some(Banner {
                        text: outcome.message,
                        expires: now + self.banner_duration,
                    });
                } else {
                    self.error_banner = Some(outcome.message);
                }
                true
            }
            BackendResponse::Closed => false,
        }
    }

    /// Re-render the detail screen if it shows `uid`.
    fn refresh_detail(&mut self, uid: Uid) -> bool {
        let Mode::Detail {
            uid: shown, lines, ..
        } = &mut self.mode
        else {
            return false;
        };
        if *shown != uid {
            return false;
        }
        match self.index.find(uid) {
            Some(message) => {
                *lines = render::render_message(message);
                true
            }
            None => false,
        }
    }

    fn clamp_cursor(&mut self) {
        let count = self.item_count();
        if self.cursor >= count {
            self.cursor = count.saturating_sub(1);
        }
    }

    /// Expire the success banner. Returns true if it was cleared.
    pub fn tick(&mut self, now: Instant) -> bool {
        match &self.banner {
            Some(banner) if now >= banner.expires => {
                self.banner = None;
                true
            }
            _ => false,
        }
    }
}
