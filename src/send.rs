//! `cleu send`: compose in an editor, confirm, deliver over SMTP.

use crate::compose::{self, ComposeError, Draft, Priority};
use crate::config::SmtpSettings;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

const USER_AGENT: &str = "cleu";
const STARTTLS_PORT: u16 = 587;

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct XPriority(Priority);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        match s.trim() {
            "1" => Ok(XPriority(Priority::High)),
            "3" => Ok(XPriority(Priority::Normal)),
            "5" => Ok(XPriority(Priority::Low)),
            other => Err(format!("unknown X-Priority '{}'", other).into()),
        }
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.x_priority().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Importance(Priority);

impl Header for Importance {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Importance")
    }

    fn parse(s: &str) -> Result<Self, BoxError> {
        Ok(Importance(s.parse::<Priority>()?))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.importance().to_string())
    }
}

/// Build the outgoing message for `draft`.
pub fn build_message(draft: &Draft, from: &str) -> Result<Message, SendError> {
    let mut builder = Message::builder()
        .from(from.parse::<Mailbox>()?)
        .subject(draft.subject.as_str())
        .user_agent(USER_AGENT.to_string())
        .header(ContentType::TEXT_PLAIN)
        .header(XPriority(draft.priority))
        .header(Importance(draft.priority));
    for to in &draft.to {
        builder = builder.to(to.parse::<Mailbox>()?);
    }
    for cc in &draft.cc {
        builder = builder.cc(cc.parse::<Mailbox>()?);
    }
    for bcc in &draft.bcc {
        builder = builder.bcc(bcc.parse::<Mailbox>()?);
    }
    Ok(builder.body(draft.body.clone())?)
}

fn transport(smtp: &SmtpSettings) -> Result<SmtpTransport, SendError> {
    let builder = if smtp.port == STARTTLS_PORT {
        SmtpTransport::starttls_relay(&smtp.host)?
    } else {
        SmtpTransport::relay(&smtp.host)?
    };
    Ok(builder
        .port(smtp.port)
        .credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ))
        .build())
}

/// Print `summary` and read a yes/no answer. Only "y" or "yes" confirms.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    summary: &str,
) -> io::Result<bool> {
    writeln!(output, "{}", summary)?;
    write!(output, "Send this email? [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Interactive send: edit, validate, confirm, deliver.
pub fn run(smtp: &SmtpSettings, editor_cmd: &str) -> Result<(), SendError> {
    let template = compose::build_compose_draft(&smtp.from);
    let edited = compose::edit_draft(&template, editor_cmd)?;
    let draft = compose::parse_draft(&edited)?;
    let message = build_message(&draft, &smtp.from)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    if !confirm(&mut input, &mut output, &draft.summary(&smtp.from))? {
        println!("Email sending cancelled.");
        return Ok(());
    }

    let mailer = transport(smtp)?;
    match mailer.send(&message) {
        Ok(_) => {
            let count = draft.recipient_count();
            info!(recipients = count, host = %smtp.host, "email sent");
            println!("Email sent successfully to {} recipient(s)!", count);
            Ok(())
        }
        Err(e) => {
            warn!(host = %smtp.host, "send failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(priority: Priority) -> Draft {
        Draft {
            to: vec!["a@example.com".to_string()],
            cc: vec!["c@example.com".to_string()],
            bcc: vec!["b@example.com".to_string()],
            subject: "Status".to_string(),
            body: "All good.".to_string(),
            priority,
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_message_headers() {
        let message = build_message(&draft(Priority::High), "me@example.com").unwrap();
        let text = formatted(&message);
        assert!(text.contains("From: me@example.com"));
        assert!(text.contains("To: a@example.com"));
        assert!(text.contains("Cc: c@example.com"));
        assert!(text.contains("Subject: Status"));
        assert!(text.contains("X-Priority: 1"));
        assert!(text.contains("Importance: High"));
        assert!(text.contains("User-Agent: cleu"));
        assert!(text.contains("text/plain; charset=utf-8"));
        assert!(text.contains("All good."));
    }

    #[test]
    fn test_bcc_in_envelope_only() {
        let message = build_message(&draft(Priority::Normal), "me@example.com").unwrap();
        assert!(!formatted(&message).contains("b@example.com"));
        assert_eq!(message.envelope().to().len(), 3);
        assert!(formatted(&message).contains("X-Priority: 3"));
    }

    #[test]
    fn test_bad_sender_rejected() {
        assert!(matches!(
            build_message(&draft(Priority::Low), "not an address"),
            Err(SendError::Address(_))
        ));
    }

    #[test]
    fn test_confirm_answers() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false)] {
            let mut input = answer.as_bytes();
            let mut output = Vec::new();
            assert_eq!(confirm(&mut input, &mut output, "To: x").unwrap(), expected);
            let shown = String::from_utf8(output).unwrap();
            assert!(shown.starts_with("To: x\n"));
        }
    }
}
