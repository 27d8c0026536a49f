//! Email address types and syntactic validation.

use crate::error::{Error, Result};

/// Bytes allowed in the local part besides alphanumerics.
const LOCAL_SPECIALS: &[u8] = b"!#$%&'*+-/=?^_`{|}~.";

/// Email address for the SMTP envelope and message headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string, validating its syntax.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a syntactically valid
    /// `local@domain` mailbox.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        if is_valid_address(&addr) {
            Ok(Self(addr))
        } else {
            Err(Error::InvalidAddress(addr))
        }
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part (after the `@`).
    #[must_use]
    pub fn domain(&self) -> &str {
        // Constructor guarantees exactly one '@'.
        self.0.rsplit('@').next().unwrap_or("")
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks whether a string is a syntactically valid mailbox address.
///
/// Accepts `local@domain` where the local part is 1-64 bytes of
/// alphanumerics and RFC 5321 atext specials (no leading, trailing, or
/// doubled dot), and the domain is either a bracketed literal
/// (`[IPv6:...]` or four dotted 1-3 digit groups) or two or more
/// hostname labels with a top label of at least two bytes.
///
/// Never panics; any parse or constraint failure yields `false`.
#[must_use]
pub fn is_valid_address(addr: &str) -> bool {
    let parts: Vec<&str> = addr.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    is_valid_local(parts[0]) && is_valid_domain(parts[1])
}

fn is_valid_local(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(&b))
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 255 {
        return false;
    }

    // Bracketed address literal: [IPv6:...] or [n.n.n.n].
    if let Some(inner) = domain
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        if inner.starts_with("IPv6:") {
            return true;
        }
        let groups: Vec<&str> = inner.split('.').collect();
        return groups.len() == 4
            && groups
                .iter()
                .all(|g| !g.is_empty() && g.len() <= 3 && g.bytes().all(|b| b.is_ascii_digit()));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }
    // Top-level label must be at least two bytes.
    labels.last().is_some_and(|top| top.len() >= 2)
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}
