pub mod app;
pub mod input;
pub mod screen;
pub mod views;

use crate::backend::{self, BackendResponse, BackendSettings};
use crate::config::{Config, ImapSettings};
use crate::session::imap_session::ImapSession;
use app::{Action, App, Failure};
use input::read_key;
use screen::Terminal;
use std::io;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long to wait for the backend to log out on quit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Run the mailbox browser until the user quits. Returns the fatal error
/// that ended the session, if any.
pub fn run(imap: ImapSettings, config: &Config) -> io::Result<Option<Failure>> {
    let settings = BackendSettings {
        mailbox: config.mail.mailbox.clone(),
        page_size: config.ui.page_size,
        trash_folders: config.mail.trash_folders.clone(),
    };
    let (cmd_tx, resp_rx) = backend::spawn(
        move || ImapSession::connect(&imap.host, imap.port, &imap.username, &imap.password),
        settings,
    );

    let mut term = Terminal::new()?;
    let mut app = App::new(
        cmd_tx,
        config.mail.mailbox.clone(),
        Duration::from_secs(config.ui.banner_secs),
    );
    app.start();
    views::render(&app, &mut term)?;

    loop {
        let mut needs_render = term.check_resize();

        while let Ok(response) = resp_rx.try_recv() {
            if app.apply(response, Instant::now()) {
                needs_render = true;
            }
        }
        if app.tick(Instant::now()) {
            needs_render = true;
        }
        if needs_render {
            views::render(&app, &mut term)?;
        }

        if let Some(key) = read_key() {
            match app.handle_key(key) {
                Action::Quit => break,
                Action::Continue => views::render(&app, &mut term)?,
            }
        }
    }

    // Restore the terminal before waiting on the network
    drop(term);
    let failure = app.fatal_failure().cloned();

    let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match resp_rx.recv_timeout(remaining) {
            Ok(BackendResponse::Closed) => {
                info!("session closed");
                break;
            }
            Ok(_) => continue,
            Err(RecvTimeoutError::Timeout) => {
                warn!("backend did not acknowledge shutdown in time");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(failure)
}
