//! SMTP extension and SASL mechanism types.

/// Server capability advertised in an EHLO response line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - opportunistic TLS upgrade
    StartTls,
    /// AUTH - advertised SASL mechanisms
    Auth(Vec<AuthMechanism>),
    /// SIZE - maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - command pipelining (advertised but never used here)
    Pipelining,
    /// SMTPUTF8 - UTF-8 addresses
    SmtpUtf8,
    /// Anything else, kept verbatim in uppercase
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO capability line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Self::Unknown(String::new());
        };

        match keyword.to_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_uppercase()),
        }
    }
}

/// SASL authentication mechanism, in preference order.
///
/// The discriminant order is the selection preference: the strongest
/// advertised mechanism wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthMechanism {
    /// PLAIN - single base64 blob (RFC 4616)
    Plain,
    /// LOGIN - legacy two-step username/password
    Login,
    /// CRAM-MD5 - challenge-response (RFC 2195)
    CramMd5,
}

impl AuthMechanism {
    /// Parses a mechanism name from an AUTH capability line.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            "CRAM-MD5" => Some(Self::CramMd5),
            _ => None,
        }
    }

    /// Returns the wire name of the mechanism.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::CramMd5 => "CRAM-MD5",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_mechanism_list() {
        let ext = Extension::parse("AUTH CRAM-MD5 LOGIN PLAIN");
        assert_eq!(
            ext,
            Extension::Auth(vec![
                AuthMechanism::CramMd5,
                AuthMechanism::Login,
                AuthMechanism::Plain,
            ])
        );
    }

    #[test]
    fn parse_auth_skips_unsupported_mechanisms() {
        let ext = Extension::parse("AUTH XOAUTH2 PLAIN");
        assert_eq!(ext, Extension::Auth(vec![AuthMechanism::Plain]));
    }

    #[test]
    fn parse_size() {
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(Extension::parse("SIZE x"), Extension::Size(None));
    }

    #[test]
    fn parse_unknown_uppercases() {
        assert_eq!(
            Extension::parse("dsn"),
            Extension::Unknown("DSN".to_string())
        );
    }

    #[test]
    fn mechanism_roundtrip() {
        for mech in [
            AuthMechanism::Plain,
            AuthMechanism::Login,
            AuthMechanism::CramMd5,
        ] {
            assert_eq!(AuthMechanism::parse(mech.as_str()), Some(mech));
        }
        assert_eq!(AuthMechanism::parse("NTLM"), None);
    }

    #[test]
    fn mechanism_strength_ordering() {
        assert!(AuthMechanism::CramMd5 > AuthMechanism::Login);
        assert!(AuthMechanism::Login > AuthMechanism::Plain);
    }
}
