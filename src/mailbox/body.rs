use crate::mime::{self, MessageBody};
use crate::session::{MailSession, SessionError, Uid};

/// Fetch and decode one message body. Decoding never fails; only the fetch
/// can.
pub fn fetch_body<S: MailSession + ?Sized>(
    session: &mut S,
    uid: Uid,
) -> Result<MessageBody, SessionError> {
    let raw = session.fetch_body(uid)?;
    Ok(mime::decode_or_raw(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::MockSession;

    #[test]
    fn test_fetch_body_decodes() {
        let mut session = MockSession::with_messages(2);
        let body = fetch_body(&mut session, 2).unwrap();
        assert_eq!(body.content_type, "text/plain");
        assert_eq!(body.merged, "Body 2");
    }

    #[test]
    fn test_fetch_body_not_found() {
        let mut session = MockSession::with_messages(2);
        assert_eq!(fetch_body(&mut session, 42), Err(SessionError::NotFound(42)));
    }

    #[test]
    fn test_undecodable_body_is_raw_text() {
        let mut session = MockSession::with_messages(1);
        session.messages[0].1 = b"Content-Type: multipart/mixed\r\n\r\n???".to_vec();
        let body = fetch_body(&mut session, 1).unwrap();
        assert_eq!(body.content_type, "text/plain");
        assert!(body.merged.contains("???"));
    }
}
