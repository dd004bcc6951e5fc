use crate::mailbox::body::fetch_body;
use crate::mailbox::index::{fetch_page, Page, PageRequest};
use crate::mailbox::trash::{move_to_trash, DeleteOutcome};
use crate::mime::MessageBody;
use crate::session::{MailSession, SessionError, Uid};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Commands sent from the UI thread to the backend thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Fetch page `page`. `loaded` is how many messages the UI already
    /// holds; the fetched window starts just below them.
    LoadPage {
        page: u32,
        append: bool,
        loaded: u32,
    },
    LoadBody {
        uid: Uid,
    },
    Delete {
        uid: Uid,
    },
    Shutdown,
}

/// Responses sent from the backend thread to the UI thread. Every command
/// yields exactly one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendResponse {
    Connected(Result<(), SessionError>),
    PageLoaded {
        page: u32,
        append: bool,
        result: Result<Page, SessionError>,
    },
    BodyLoaded {
        uid: Uid,
        result: Result<MessageBody, SessionError>,
    },
    DeleteCompleted {
        uid: Uid,
        outcome: DeleteOutcome,
    },
    Closed,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub mailbox: String,
    pub page_size: u32,
    pub trash_folders: Vec<String>,
}

/// Spawn the backend thread. `connect` runs on that thread, and the session
/// it returns never leaves it. Returns the command sender and response
/// receiver.
pub fn spawn<S, F>(
    connect: F,
    settings: BackendSettings,
) -> (
    mpsc::Sender<BackendCommand>,
    mpsc::Receiver<BackendResponse>,
)
where
    S: MailSession,
    F: FnOnce() -> Result<S, SessionError> + Send + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel::<BackendCommand>();
    let (resp_tx, resp_rx) = mpsc::channel::<BackendResponse>();

    thread::spawn(move || {
        let mut session = match connect() {
            Ok(session) => {
                let _ = resp_tx.send(BackendResponse::Connected(Ok(())));
                session
            }
            Err(e) => {
                error!("connection failed: {}", e);
                let _ = resp_tx.send(BackendResponse::Connected(Err(e)));
                return;
            }
        };
        backend_loop(&mut session, &settings, cmd_rx, resp_tx);
    });

    (cmd_tx, resp_rx)
}

fn backend_loop<S: MailSession>(
    session: &mut S,
    settings: &BackendSettings,
    cmd_rx: mpsc::Receiver<BackendCommand>,
    resp_tx: mpsc::Sender<BackendResponse>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        debug!(?cmd, "backend command");
        match cmd {
            BackendCommand::LoadPage {
                page,
                append,
                loaded,
            } => {
                let request = if append {
                    PageRequest::After(loaded)
                } else {
                    PageRequest::Page(page)
                };
                let result =
                    fetch_page(session, &settings.mailbox, request, settings.page_size);
                match &result {
                    Ok(p) => info!(page, fetched = p.messages.len(), total = p.total, "page loaded"),
                    Err(e) => warn!(page, "page load failed: {}", e),
                }
                let _ = resp_tx.send(BackendResponse::PageLoaded {
                    page,
                    append,
                    result,
                });
            }
            BackendCommand::LoadBody { uid } => {
                let result = fetch_body(session, uid);
                if let Err(e) = &result {
                    warn!(uid, "body load failed: {}", e);
                }
                let _ = resp_tx.send(BackendResponse::BodyLoaded { uid, result });
            }
            BackendCommand::Delete { uid } => {
                let outcome =
                    move_to_trash(session, &settings.mailbox, uid, &settings.trash_folders);
                let _ = resp_tx.send(BackendResponse::DeleteCompleted { uid, outcome });
            }
            BackendCommand::Shutdown => {
                if let Err(e) = session.logout() {
                    debug!("logout failed: {}", e);
                }
                let _ = resp_tx.send(BackendResponse::Closed);
                return;
            }
        }
    }

    // The UI dropped its sender without saying goodbye.
    let _ = session.logout();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::MockSession;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn settings() -> BackendSettings {
        BackendSettings {
            mailbox: "INBOX".to_string(),
            page_size: 50,
            trash_folders: vec!["Trash".to_string()],
        }
    }

    fn spawn_mock(
        session: MockSession,
    ) -> (
        mpsc::Sender<BackendCommand>,
        mpsc::Receiver<BackendResponse>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let calls = session.calls.clone();
        let (tx, rx) = spawn(move || Ok(session), settings());
        assert_eq!(
            rx.recv_timeout(TIMEOUT).unwrap(),
            BackendResponse::Connected(Ok(()))
        );
        (tx, rx, calls)
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let (_tx, rx) = spawn(
            || -> Result<MockSession, SessionError> {
                Err(SessionError::Auth("invalid credentials".into()))
            },
            settings(),
        );
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::Connected(Err(e)) => assert!(e.is_fatal()),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_page_commands_use_loaded_offset() {
        let (tx, rx, calls) = spawn_mock(MockSession::with_messages(120));

        tx.send(BackendCommand::LoadPage {
            page: 1,
            append: false,
            loaded: 0,
        })
        .unwrap();
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::PageLoaded {
                page: 1,
                append: false,
                result: Ok(page),
            } => {
                assert_eq!(page.messages.len(), 50);
                assert_eq!(page.total, 120);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        tx.send(BackendCommand::LoadPage {
            page: 3,
            append: true,
            loaded: 100,
        })
        .unwrap();
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::PageLoaded {
                result: Ok(page), ..
            } => assert_eq!(page.messages.len(), 20),
            other => panic!("unexpected response: {:?}", other),
        }

        let calls = calls.lock().unwrap().clone();
        assert!(calls.contains(&"fetch 71:120".to_string()));
        assert!(calls.contains(&"fetch 1:20".to_string()));
    }

    #[test]
    fn test_body_and_delete_round_trip() {
        let (tx, rx, _calls) = spawn_mock(MockSession::with_messages(3));

        tx.send(BackendCommand::LoadBody { uid: 2 }).unwrap();
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::BodyLoaded {
                uid: 2,
                result: Ok(body),
            } => assert_eq!(body.merged, "Body 2"),
            other => panic!("unexpected response: {:?}", other),
        }

        tx.send(BackendCommand::Delete { uid: 2 }).unwrap();
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::DeleteCompleted { uid: 2, outcome } => {
                assert!(outcome.success);
                assert_eq!(outcome.message, "Moved to Trash");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_protocol_error_is_passed_through() {
        let mut session = MockSession::with_messages(3);
        session.fail_fetch = Some(SessionError::Protocol("BAD".into()));
        let (tx, rx, _calls) = spawn_mock(session);

        tx.send(BackendCommand::LoadBody { uid: 1 }).unwrap();
        match rx.recv_timeout(TIMEOUT).unwrap() {
            BackendResponse::BodyLoaded { result: Err(e), .. } => assert!(!e.is_fatal()),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_logs_out() {
        let (tx, rx, calls) = spawn_mock(MockSession::with_messages(1));
        tx.send(BackendCommand::Shutdown).unwrap();
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), BackendResponse::Closed);
        assert_eq!(calls.lock().unwrap().last().map(String::as_str), Some("logout"));
    }
}
