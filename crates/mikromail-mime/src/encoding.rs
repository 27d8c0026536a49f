//! Quoted-printable and RFC 2047 header encoding.

use std::fmt::Write as _;

/// Hard ceiling on an encoded line, including a trailing soft-break `=`.
const MAX_LINE_LENGTH: usize = 76;

/// Encodes body text as quoted-printable (RFC 2045 section 6.7).
///
/// Line endings are normalized to CRLF first. Printable ASCII (except
/// `=`) and spaces pass through; every other byte of the UTF-8 encoding
/// becomes `=HH` with uppercase hex. A soft line break is inserted before
/// any chunk that would push the current line past 75 characters, so no
/// encoded line ever exceeds 76 characters before its CRLF.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let normalized = normalize_line_endings(text);
    let mut out = String::with_capacity(normalized.len() + normalized.len() / 8);
    let mut line_len = 0usize;

    for &byte in normalized.as_bytes() {
        match byte {
            b'\r' => out.push('\r'),
            b'\n' => {
                out.push('\n');
                line_len = 0;
            }
            b' ' | 0x21..=0x3C | 0x3E..=0x7E => {
                if line_len + 1 >= MAX_LINE_LENGTH {
                    out.push_str("=\r\n");
                    line_len = 0;
                }
                out.push(char::from(byte));
                line_len += 1;
            }
            _ => {
                if line_len + 3 >= MAX_LINE_LENGTH {
                    out.push_str("=\r\n");
                    line_len = 0;
                }
                let _ = write!(out, "={byte:02X}");
                line_len += 3;
            }
        }
    }

    out
}

/// Encodes a header value as an RFC 2047 encoded word when needed.
///
/// Pure ASCII passes through untouched; anything else becomes
/// `=?UTF-8?Q?...?=` with each non-ASCII byte as `=HH` uppercase hex.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut out = String::from("=?UTF-8?Q?");
    for &byte in value.as_bytes() {
        if byte.is_ascii() {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
    }
    out.push_str("?=");
    out
}

/// Sanitizes a header value against injection, then encodes it.
///
/// Runs of CR, LF, and TAB collapse to a single space, multi-space runs
/// collapse to one, and the result is trimmed before encoding. The
/// output can never carry a line break into the header block.
#[must_use]
pub fn sanitize_header_value(value: &str) -> String {
    let mut spaced = String::with_capacity(value.len());
    let mut in_break = false;
    for ch in value.chars() {
        if matches!(ch, '\r' | '\n' | '\t') {
            if !in_break {
                spaced.push(' ');
                in_break = true;
            }
        } else {
            spaced.push(ch);
            in_break = false;
        }
    }

    let mut collapsed = String::with_capacity(spaced.len());
    let mut prev_space = false;
    for ch in spaced.chars() {
        if ch == ' ' {
            if !prev_space {
                collapsed.push(' ');
            }
            prev_space = true;
        } else {
            collapsed.push(ch);
            prev_space = false;
        }
    }

    encode_header_value(collapsed.trim())
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n")
}
