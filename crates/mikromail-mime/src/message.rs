//! Outbound message assembly.

use crate::encoding::encode_quoted_printable;
use crate::error::{Error, Result};
use crate::header::Headers;
use chrono::Utc;
use rand::Rng;
use std::fmt::Write as _;

/// Ceiling on the assembled message, in bytes (10 MiB).
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Builder for a complete RFC 5322 message.
///
/// Blind-carbon-copy recipients never reach the builder: they exist only
/// in the SMTP envelope, so the composed header block cannot leak them.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from: String,
    to: Vec<String>,
    cc: Vec<String>,
    reply_to: Option<String>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    extra_headers: Vec<(String, String)>,
    id_domain: String,
}

impl MessageBuilder {
    /// Creates a builder for a message from the given sender.
    #[must_use]
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            cc: Vec::new(),
            reply_to: None,
            subject: String::new(),
            text: None,
            html: None,
            extra_headers: Vec::new(),
            id_domain: "localhost".to_string(),
        }
    }

    /// Adds a visible recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a carbon-copy recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Sets the Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    /// Appends a user-supplied header. Reserved and malformed names are
    /// dropped at build time.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the domain used in the generated Message-ID (typically the
    /// domain of the submitting account).
    #[must_use]
    pub fn id_domain(mut self, domain: impl Into<String>) -> Self {
        self.id_domain = domain.into();
        self
    }

    /// Assembles the message: ordered headers, generated Message-ID and
    /// Date, and a quoted-printable body (multipart/alternative when
    /// both text and HTML are present, a single part otherwise).
    ///
    /// # Errors
    ///
    /// Fails when no recipient or no body was supplied.
    pub fn build(self) -> Result<ComposedMessage> {
        if self.to.is_empty() {
            return Err(Error::MissingRecipients);
        }
        if self.text.is_none() && self.html.is_none() {
            return Err(Error::MissingBody);
        }

        let message_id = format!("<{}@{}>", random_hex(16), self.id_domain);

        let mut headers = Headers::new();
        headers.push_sanitized("From", &self.from);
        headers.push_sanitized("To", &self.to.join(", "));
        headers.push_sanitized("Subject", &self.subject);
        headers.push_raw("Message-ID", message_id.clone());
        headers.push_raw("Date", Utc::now().to_rfc2822());
        headers.push_raw("MIME-Version", "1.0");
        if !self.cc.is_empty() {
            headers.push_sanitized("Cc", &self.cc.join(", "));
        }
        if let Some(reply_to) = &self.reply_to {
            headers.push_sanitized("Reply-To", reply_to);
        }
        for (name, value) in &self.extra_headers {
            let _ = headers.push_extra(name, value);
        }

        let body = match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                let boundary = format!("----=_NextPart_{}", random_hex(12));
                headers.push_raw(
                    "Content-Type",
                    format!("multipart/alternative; boundary=\"{boundary}\""),
                );
                let mut body = String::new();
                write_part(&mut body, &boundary, "text/plain", text);
                write_part(&mut body, &boundary, "text/html", html);
                let _ = write!(body, "--{boundary}--\r\n");
                body
            }
            (Some(text), None) => {
                headers.push_raw("Content-Type", "text/plain; charset=utf-8");
                headers.push_raw("Content-Transfer-Encoding", "quoted-printable");
                encode_quoted_printable(text)
            }
            (None, Some(html)) => {
                headers.push_raw("Content-Type", "text/html; charset=utf-8");
                headers.push_raw("Content-Transfer-Encoding", "quoted-printable");
                encode_quoted_printable(html)
            }
            (None, None) => unreachable!("checked above"),
        };

        let mut wire = headers.to_wire();
        wire.push_str("\r\n");
        wire.push_str(&body);

        Ok(ComposedMessage {
            message_id,
            bytes: wire.into_bytes(),
        })
    }
}

/// A fully assembled message ready for the DATA phase.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    /// The generated Message-ID, including angle brackets.
    pub message_id: String,
    bytes: Vec<u8>,
}

impl ComposedMessage {
    /// Returns the wire bytes of the message.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the assembled size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length message (cannot happen via the
    /// builder, present for completeness).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true when the message exceeds [`MAX_MESSAGE_SIZE`].
    #[must_use]
    pub fn exceeds_size_limit(&self) -> bool {
        self.bytes.len() > MAX_MESSAGE_SIZE
    }
}

fn write_part(out: &mut String, boundary: &str, content_type: &str, body: &str) {
    let _ = write!(out, "--{boundary}\r\n");
    let _ = write!(out, "Content-Type: {content_type}; charset=utf-8\r\n");
    let _ = write!(out, "Content-Transfer-Encoding: quoted-printable\r\n\r\n");
    let _ = write!(out, "{}\r\n", encode_quoted_printable(body));
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(buf.as_mut_slice());
    let mut out = String::with_capacity(bytes * 2);
    for byte in buf {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn builder() -> MessageBuilder {
        MessageBuilder::new("sender@example.com")
            .to("friend@example.org")
            .subject("Greetings")
            .id_domain("example.com")
    }

    fn wire(message: &ComposedMessage) -> String {
        String::from_utf8(message.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn header_order_is_fixed() {
        let message = builder()
            .text("hello")
            .cc("third@example.org")
            .reply_to("replies@example.com")
            .header("X-Mailer", "mikromail")
            .build()
            .unwrap();
        let text = wire(&message);
        let names: Vec<&str> = text
            .split("\r\n\r\n")
            .next()
            .unwrap()
            .lines()
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "From",
                "To",
                "Subject",
                "Message-ID",
                "Date",
                "MIME-Version",
                "Cc",
                "Reply-To",
                "X-Mailer",
                "Content-Type",
                "Content-Transfer-Encoding",
            ]
        );
    }

    #[test]
    fn message_id_shape() {
        let message = builder().text("hello").build().unwrap();
        let id = &message.message_id;
        assert!(id.starts_with('<') && id.ends_with("@example.com>"));
        let hex = &id[1..33];
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
        assert!(wire(&message).contains(&format!("Message-ID: {id}")));
    }

    #[test]
    fn text_only_single_part() {
        let message = builder().text("just text").build().unwrap();
        let text = wire(&message);
        assert!(text.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(text.contains("Content-Transfer-Encoding: quoted-printable"));
        assert!(!text.contains("multipart/alternative"));
        assert!(text.ends_with("\r\n\r\njust text"));
    }

    #[test]
    fn html_only_single_part() {
        let message = builder().html("<b>hi</b>").build().unwrap();
        let text = wire(&message);
        assert!(text.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!text.contains("multipart/alternative"));
    }

    #[test]
    fn both_bodies_make_multipart_alternative() {
        let message = builder().text("hi").html("<b>hi</b>").build().unwrap();
        let text = wire(&message);

        let marker = "multipart/alternative; boundary=\"----=_NextPart_";
        let at = text.find(marker).expect("multipart content type");
        let boundary_start = at + "multipart/alternative; boundary=\"".len();
        let boundary: String = text[boundary_start..]
            .chars()
            .take_while(|c| *c != '"')
            .collect();
        assert_eq!(boundary.len(), "----=_NextPart_".len() + 24);

        assert_eq!(text.matches(&format!("--{boundary}\r\n")).count(), 2);
        assert!(text.contains(&format!("--{boundary}--\r\n")));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn bodies_are_quoted_printable() {
        let message = builder().text("a=b é").build().unwrap();
        assert!(wire(&message).contains("a=3Db =C3=A9"));
    }

    #[test]
    fn subject_is_sanitized_and_encoded() {
        let message = builder()
            .subject("Sübject\r\nInjected: yes")
            .text("x")
            .build()
            .unwrap();
        let text = wire(&message);
        assert!(!text.contains("Injected: yes\r\n"));
        assert!(text.contains("Subject: =?UTF-8?Q?S=C3=BCbject Injected: yes?="));
    }

    #[test]
    fn to_list_is_comma_joined() {
        let message = MessageBuilder::new("s@example.com")
            .to("a@example.org")
            .to("b@example.org")
            .text("x")
            .build()
            .unwrap();
        assert!(wire(&message).contains("To: a@example.org, b@example.org"));
    }

    #[test]
    fn reserved_extras_are_dropped() {
        let message = builder()
            .text("x")
            .header("Bcc", "sneak@example.org")
            .header("subject", "override")
            .header("X-Keep", "kept")
            .build()
            .unwrap();
        let text = wire(&message);
        assert!(!text.contains("Bcc:"));
        assert!(!text.contains("override"));
        assert!(text.contains("X-Keep: kept"));
    }

    #[test]
    fn missing_body_and_recipients_fail() {
        assert!(matches!(
            builder().build(),
            Err(Error::MissingBody)
        ));
        assert!(matches!(
            MessageBuilder::new("s@example.com").text("x").build(),
            Err(Error::MissingRecipients)
        ));
    }

    #[test]
    fn size_accounting() {
        let message = builder().text("x").build().unwrap();
        assert!(!message.is_empty());
        assert_eq!(message.len(), message.as_bytes().len());
        assert!(!message.exceeds_size_limit());
    }
}
