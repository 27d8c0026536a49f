//! Connection management: transport streams and the type-state client.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server identity and capabilities learned from the greeting and EHLO.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Host name the server announced in its greeting.
    pub hostname: String,
    /// Capabilities parsed from the EHLO response.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks whether the server advertised STARTTLS.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Returns the advertised SASL mechanisms, empty when no AUTH
    /// capability line was present.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        for ext in &self.extensions {
            if let Extension::Auth(mechanisms) = ext {
                return mechanisms.clone();
            }
        }
        Vec::new()
    }

    /// Returns the advertised maximum message size, if any.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        for ext in &self.extensions {
            if let Extension::Size(size) = ext {
                return *size;
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(lines: &[&str]) -> ServerInfo {
        ServerInfo {
            hostname: "smtp.example.com".to_string(),
            extensions: lines.iter().map(|l| Extension::parse(l)).collect(),
        }
    }

    #[test]
    fn starttls_detection() {
        assert!(info(&["STARTTLS", "PIPELINING"]).supports_starttls());
        assert!(!info(&["PIPELINING"]).supports_starttls());
    }

    #[test]
    fn auth_mechanism_listing() {
        let server = info(&["AUTH CRAM-MD5 LOGIN PLAIN", "SIZE 1000"]);
        let mechanisms = server.auth_mechanisms();
        assert_eq!(mechanisms.len(), 3);
        assert!(mechanisms.contains(&AuthMechanism::CramMd5));
        assert!(info(&["SIZE 1000"]).auth_mechanisms().is_empty());
    }

    #[test]
    fn size_limit() {
        assert_eq!(info(&["SIZE 35882577"]).max_message_size(), Some(35_882_577));
        assert_eq!(info(&["STARTTLS"]).max_message_size(), None);
    }
}
