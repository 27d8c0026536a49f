//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// An outbound SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - extended greeting
    Ehlo {
        /// Client host name
        client_name: String,
    },
    /// STARTTLS - request TLS upgrade
    StartTls,
    /// AUTH - begin an authentication exchange
    Auth {
        /// Mechanism to use
        mechanism: AuthMechanism,
        /// Initial response (SASL-IR), e.g. the PLAIN blob
        initial_response: Option<String>,
    },
    /// A bare continuation line within an AUTH exchange
    /// (base64 username, password, or CRAM-MD5 digest).
    AuthResponse(String),
    /// MAIL FROM - open a mail transaction
    MailFrom {
        /// Envelope sender
        from: Address,
    },
    /// RCPT TO - add an envelope recipient
    RcptTo {
        /// Envelope recipient
        to: Address,
    },
    /// DATA - begin message content
    Data,
    /// RSET - abort the current transaction
    Rset,
    /// QUIT - close the session
    Quit,
}

impl Command {
    /// Serializes the command to wire bytes, CRLF-terminated.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { client_name } => format!("EHLO {client_name}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response: Some(resp),
            } => format!("AUTH {} {resp}", mechanism.as_str()),
            Self::Auth {
                mechanism,
                initial_response: None,
            } => format!("AUTH {}", mechanism.as_str()),
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Quit => "QUIT".to_string(),
        };

        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns the command text suitable for logging. Authentication
    /// commands and their continuation lines carry credentials and are
    /// replaced wholesale.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Auth { .. } | Self::AuthResponse(_) => "[Credentials hidden]".to_string(),
            other => {
                String::from_utf8_lossy(&other.serialize()).trim_end().to_string()
            }
        }
    }
}
