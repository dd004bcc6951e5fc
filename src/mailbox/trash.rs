//! Move-to-trash with a flag-and-expunge fallback.

use crate::session::{ExpungeScope, MailSession, SessionError, Uid};
use tracing::{info, warn};

/// Conventional trash folder names, most likely first.
pub const DEFAULT_TRASH_FOLDERS: &[&str] = &[
    "Trash",
    "[Gmail]/Trash",
    "Deleted Items",
    "Deleted Messages",
    "INBOX.Trash",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}

impl DeleteOutcome {
    fn ok(message: impl Into<String>) -> Self {
        DeleteOutcome {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        DeleteOutcome {
            success: false,
            message: message.into(),
        }
    }
}

/// Move `uid` out of `source` into the first existing trash folder. When no
/// candidate works the message is flagged deleted and expunged instead.
pub fn move_to_trash<S: MailSession + ?Sized>(
    session: &mut S,
    source: &str,
    uid: Uid,
    candidates: &[String],
) -> DeleteOutcome {
    for folder in candidates.iter().filter(|f| f.as_str() != source) {
        match session.folder_exists(folder) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(folder, "could not check trash folder: {}", e);
                continue;
            }
        }
        if let Err(e) = session.select_mailbox(source) {
            warn!(source, "could not reselect source mailbox: {}", e);
            continue;
        }
        match session.move_message(uid, folder) {
            Ok(()) => {
                info!(uid, folder, "moved to trash");
                return DeleteOutcome::ok(format!("Moved to {}", folder));
            }
            Err(e) => warn!(uid, folder, "move failed: {}", e),
        }
    }

    match flag_and_expunge(session, source, uid) {
        Ok(ExpungeScope::Message) => {
            info!(uid, "deleted by flag and expunge");
            DeleteOutcome::ok("Message deleted")
        }
        Ok(ExpungeScope::Mailbox) => {
            info!(uid, "deleted by flag and mailbox-wide expunge");
            DeleteOutcome::ok("Message deleted (all messages marked deleted were expunged)")
        }
        Err(e) => {
            warn!(uid, "delete failed: {}", e);
            DeleteOutcome::failed(format!("Delete failed: {}", e))
        }
    }
}

fn flag_and_expunge<S: MailSession + ?Sized>(
    session: &mut S,
    source: &str,
    uid: Uid,
) -> Result<ExpungeScope, SessionError> {
    session.select_mailbox(source)?;
    session.flag_deleted(uid)?;
    session.expunge(uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::MockSession;

    fn defaults() -> Vec<String> {
        DEFAULT_TRASH_FOLDERS.iter().map(|s| s.to_string()).collect()
    }

    fn calls(session: &MockSession) -> Vec<String> {
        session.calls.lock().unwrap().clone()
    }

    #[test]
    fn test_first_existing_folder_wins() {
        let mut session = MockSession::with_messages(3);
        session.folders = vec!["INBOX".into(), "Deleted Items".into(), "INBOX.Trash".into()];

        let outcome = move_to_trash(&mut session, "INBOX", 2, &defaults());

        assert!(outcome.success);
        assert_eq!(outcome.message, "Moved to Deleted Items");
        assert_eq!(
            calls(&session),
            vec![
                "exists Trash",
                "exists [Gmail]/Trash",
                "exists Deleted Items",
                "select INBOX",
                "move 2 Deleted Items",
            ]
        );
        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_failed_moves_fall_back_to_expunge() {
        let mut session = MockSession::with_messages(3);
        session.fail_moves = true;

        let outcome = move_to_trash(&mut session, "INBOX", 1, &["Trash".to_string()]);

        assert!(outcome.success);
        assert_eq!(outcome.message, "Message deleted");
        assert_eq!(
            calls(&session),
            vec![
                "exists Trash",
                "select INBOX",
                "move 1 Trash",
                "select INBOX",
                "flag 1",
                "expunge 1",
            ]
        );
        assert!(session.messages.iter().all(|(h, _)| h.uid != 1));
    }

    #[test]
    fn test_no_folder_without_uidplus_widens_expunge() {
        let mut session = MockSession::with_messages(3);
        session.folders.clear();
        session.uidplus = false;
        session.flagged.insert(3);

        let outcome = move_to_trash(&mut session, "INBOX", 1, &defaults());

        assert!(outcome.success);
        assert!(outcome.message.contains("all messages marked deleted"));
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_total_failure_reports_error() {
        let mut session = MockSession::with_messages(3);
        session.fail_moves = true;
        session.fail_store = true;

        let outcome = move_to_trash(&mut session, "INBOX", 1, &defaults());

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Delete failed"));
        assert_eq!(session.messages.len(), 3);
    }

    #[test]
    fn test_source_folder_is_not_a_candidate() {
        let mut session = MockSession::with_messages(1);
        let outcome = move_to_trash(&mut session, "Trash", 1, &["Trash".to_string()]);
        assert_eq!(outcome.message, "Message deleted");
        assert!(!calls(&session).contains(&"exists Trash".to_string()));
    }
}
