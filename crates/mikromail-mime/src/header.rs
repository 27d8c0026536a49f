//! Ordered header block for outbound messages.

use crate::encoding::sanitize_header_value;

/// Header names the composer owns; user-supplied duplicates are dropped.
const RESERVED_NAMES: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "subject",
    "date",
    "message-id",
];

/// An ordered list of header fields. Order is emission order.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header whose value is trusted as-is (Message-ID, Date,
    /// content-type fields built by the composer).
    pub fn push_raw(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Appends a header after routing the value through the sanitizer
    /// and RFC 2047 encoder.
    pub fn push_sanitized(&mut self, name: impl Into<String>, value: &str) {
        self.entries.push((name.into(), sanitize_header_value(value)));
    }

    /// Appends a user-supplied extra header. Names colliding with
    /// composer-owned headers, and names outside `[A-Za-z0-9-]+`, are
    /// silently dropped. Returns whether the header was kept.
    pub fn push_extra(&mut self, name: &str, value: &str) -> bool {
        if !is_valid_header_name(name) || is_reserved_header_name(name) {
            return false;
        }
        self.push_sanitized(name.to_string(), value);
        true
    }

    /// Returns the first value stored under `name`, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the fields in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Renders the block as CRLF-terminated wire lines, without the
    /// blank separator line.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.entries {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out
    }
}

/// Checks a header name against `[A-Za-z0-9-]+`.
#[must_use]
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Checks whether the composer owns this header name.
#[must_use]
pub fn is_reserved_header_name(name: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut headers = Headers::new();
        headers.push_raw("From", "a@example.com");
        headers.push_raw("To", "b@example.com");
        headers.push_raw("Subject", "hello");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["From", "To", "Subject"]);
    }

    #[test]
    fn sanitized_push_encodes() {
        let mut headers = Headers::new();
        headers.push_sanitized("Subject", "line\r\nbreak");
        assert_eq!(headers.get("subject"), Some("line break"));
    }

    #[test]
    fn extras_drop_reserved_names() {
        let mut headers = Headers::new();
        for name in ["From", "SUBJECT", "bcc", "Message-Id", "date"] {
            assert!(!headers.push_extra(name, "x"), "{name} should be dropped");
        }
        assert!(headers.push_extra("X-Mailer", "mikromail"));
        assert_eq!(headers.get("x-mailer"), Some("mikromail"));
    }

    #[test]
    fn extras_drop_invalid_names() {
        let mut headers = Headers::new();
        assert!(!headers.push_extra("X Header", "x"));
        assert!(!headers.push_extra("X:Header", "x"));
        assert!(!headers.push_extra("", "x"));
        assert!(headers.push_extra("X-Priority-2", "1"));
    }

    #[test]
    fn wire_rendering() {
        let mut headers = Headers::new();
        headers.push_raw("MIME-Version", "1.0");
        headers.push_raw("X-Test", "yes");
        assert_eq!(headers.to_wire(), "MIME-Version: 1.0\r\nX-Test: yes\r\n");
    }
}
