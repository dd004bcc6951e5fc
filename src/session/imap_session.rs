use super::{ExpungeScope, HeaderRecord, MailSession, MailboxInfo, SeqRange, SessionError, Uid};
use imap::types::Flag;
use native_tls::{TlsConnector, TlsStream};
use std::net::TcpStream;
use tracing::{debug, info, warn};

/// One authenticated IMAP connection over implicit TLS.
pub struct ImapSession {
    session: imap::Session<TlsStream<TcpStream>>,
    uidplus: bool,
}

impl ImapSession {
    pub fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, SessionError> {
        debug!(host, port, "connecting to IMAP server");
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let client = imap::connect((host, port), host, &tls)
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        let mut session = client
            .login(username, password)
            .map_err(|(e, _client)| SessionError::Auth(e.to_string()))?;

        let uidplus = match session.capabilities() {
            Ok(caps) => caps.has_str("UIDPLUS"),
            Err(e) => {
                warn!("CAPABILITY failed, assuming no UIDPLUS: {}", e);
                false
            }
        };
        info!(host, username, uidplus, "logged in");

        Ok(ImapSession { session, uidplus })
    }
}

fn map_err(e: imap::Error) -> SessionError {
    match e {
        imap::Error::Io(_) | imap::Error::ConnectionLost => SessionError::Connection(e.to_string()),
        _ => SessionError::Protocol(e.to_string()),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Personal name when present, otherwise `mailbox@host`.
fn display_address(
    name: Option<&[u8]>,
    mailbox: Option<&[u8]>,
    host: Option<&[u8]>,
) -> Option<String> {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        return Some(lossy(name));
    }
    match (mailbox, host) {
        (Some(mailbox), Some(host)) => Some(format!("{}@{}", lossy(mailbox), lossy(host))),
        (Some(mailbox), None) => Some(lossy(mailbox)),
        _ => None,
    }
}

/// Quote a mailbox name for LIST, which the client library passes through
/// verbatim.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

impl MailSession for ImapSession {
    fn select_mailbox(&mut self, name: &str) -> Result<MailboxInfo, SessionError> {
        let mailbox = self.session.select(name).map_err(map_err)?;
        debug!(mailbox = name, exists = mailbox.exists, "selected");
        Ok(MailboxInfo {
            message_count: mailbox.exists,
        })
    }

    fn fetch_headers(&mut self, range: SeqRange) -> Result<Vec<HeaderRecord>, SessionError> {
        debug!(%range, "fetching headers");
        let fetches = self
            .session
            .fetch(range.to_string(), "(UID FLAGS ENVELOPE)")
            .map_err(map_err)?;

        let mut records = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            let Some(envelope) = fetch.envelope() else {
                continue;
            };
            let Some(uid) = fetch.uid else {
                warn!(seq = fetch.message, "FETCH response without UID, skipping");
                continue;
            };
            let from = envelope
                .from
                .as_ref()
                .and_then(|addrs| addrs.first())
                .and_then(|a| display_address(a.name, a.mailbox, a.host));
            let to = envelope
                .to
                .as_ref()
                .and_then(|addrs| addrs.first())
                .and_then(|a| display_address(a.name, a.mailbox, a.host));

            records.push(HeaderRecord {
                uid,
                subject: envelope.subject.map(lossy),
                from,
                to,
                date: envelope.date.map(lossy),
                seen: fetch.flags().iter().any(|f| matches!(f, Flag::Seen)),
            });
        }
        Ok(records)
    }

    fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, SessionError> {
        debug!(uid, "fetching body");
        let fetches = self
            .session
            .uid_fetch(uid.to_string(), "BODY[]")
            .map_err(map_err)?;
        fetches
            .iter()
            .find_map(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or(SessionError::NotFound(uid))
    }

    fn folder_exists(&mut self, name: &str) -> Result<bool, SessionError> {
        let names = self
            .session
            .list(Some(""), Some(&quote(name)))
            .map_err(map_err)?;
        Ok(!names.is_empty())
    }

    fn move_message(&mut self, uid: Uid, folder: &str) -> Result<(), SessionError> {
        debug!(uid, folder, "moving");
        self.session
            .uid_mv(uid.to_string(), folder)
            .map_err(map_err)
    }

    fn flag_deleted(&mut self, uid: Uid) -> Result<(), SessionError> {
        self.session
            .uid_store(uid.to_string(), "+FLAGS (\\Deleted)")
            .map(|_| ())
            .map_err(map_err)
    }

    fn expunge(&mut self, uid: Uid) -> Result<ExpungeScope, SessionError> {
        if self.uidplus {
            self.session
                .uid_expunge(uid.to_string())
                .map_err(map_err)?;
            Ok(ExpungeScope::Message)
        } else {
            warn!(uid, "server lacks UIDPLUS, expunging every flagged message");
            self.session.expunge().map_err(map_err)?;
            Ok(ExpungeScope::Mailbox)
        }
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.session.logout().map_err(map_err)
    }
}
