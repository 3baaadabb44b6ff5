//! Outgoing message building for the mail provider
//!
//! Plain messages are a single `text/plain` part; messages with an attachment
//! become `multipart/mixed`. MIME assembly and transfer encoding are left to
//! `lettre`.

use crate::error::{OutreachError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file attached to every message of a campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its content type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        let content_type = if is_pdf {
            "application/pdf"
        } else {
            "application/octet-stream"
        };

        Ok(Self::new(filename, content_type, data))
    }

    fn to_part(&self) -> Result<SinglePart> {
        check_header("attachment filename", &self.filename)?;
        let content_type = ContentType::parse(&self.content_type).map_err(|e| {
            OutreachError::Message(format!(
                "invalid content type {:?}: {e}",
                self.content_type
            ))
        })?;
        Ok(lettre::message::Attachment::new(self.filename.clone())
            .body(self.data.clone(), content_type))
    }
}

/// One message from the signed-in sender to one recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl OutgoingMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Build the MIME message
    pub fn build(&self) -> Result<Message> {
        check_header("Subject", &self.subject)?;
        let from = parse_mailbox("From", &self.from)?;
        let to = parse_mailbox("To", &self.to)?;

        let builder = Message::builder().from(from).to(to).subject(&self.subject);

        let built = match &self.attachment {
            None => builder.body(self.body.clone()),
            Some(attachment) => builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.body.clone()))
                    .singlepart(attachment.to_part()?),
            ),
        };

        built.map_err(|e| OutreachError::Message(e.to_string()))
    }

    /// Render as RFC 5322 text with CRLF line endings
    pub fn render(&self) -> Result<String> {
        String::from_utf8(self.build()?.formatted())
            .map_err(|e| OutreachError::Message(format!("rendered message is not UTF-8: {e}")))
    }

    /// URL-safe base64 of the formatted message, the `raw` field of a Gmail
    /// `users.messages.send` request
    pub fn to_gmail_raw(&self) -> Result<String> {
        Ok(URL_SAFE.encode(self.build()?.formatted()))
    }
}

fn check_header(name: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(OutreachError::Message(format!(
            "{name} must not contain line breaks"
        )));
    }
    Ok(())
}

fn parse_mailbox(name: &str, value: &str) -> Result<Mailbox> {
    check_header(name, value)?;
    value
        .trim()
        .parse()
        .map_err(|_| OutreachError::Message(format!("{name} address {value:?} is invalid")))
}
