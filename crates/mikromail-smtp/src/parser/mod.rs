//! SMTP response parsing.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses a complete SMTP reply from accumulated response lines.
///
/// Replies are one or more lines, each starting with the same three-digit
/// code. Continuation lines use `-` as the fourth character; the final
/// line uses a space:
///
/// ```text
/// 250-smtp.example.com greets you
/// 250-STARTTLS
/// 250 SIZE 35882577
/// ```
///
/// # Errors
///
/// Returns a protocol error when the reply is empty or any line is too
/// short or carries a non-numeric code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("empty reply".into()));
    };

    let code = first
        .get(0..3)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| Error::Protocol(format!("malformed reply line: {first:?}")))?;

    let mut text = Vec::with_capacity(lines.len());
    for line in lines {
        match line.len() {
            0..=2 => return Err(Error::Protocol(format!("malformed reply line: {line:?}"))),
            3 => text.push(String::new()),
            _ => text.push(line[4..].to_string()),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), text))
}

/// Returns true when a line terminates a reply: a three-digit code
/// followed by a space (rather than the `-` continuation marker).
#[must_use]
pub fn is_final_reply_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() >= 4
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && bytes[3] == b' '
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_single_line() {
        let reply = parse_reply(&lines(&["250 OK"])).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.lines, vec!["OK"]);
    }

    #[test]
    fn parses_multi_line_capabilities() {
        let reply = parse_reply(&lines(&[
            "250-smtp.example.com",
            "250-STARTTLS",
            "250 SIZE 35882577",
        ]))
        .unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(
            reply.lines,
            vec!["smtp.example.com", "STARTTLS", "SIZE 35882577"]
        );
    }

    #[test]
    fn parses_bare_code() {
        let reply = parse_reply(&lines(&["250"])).unwrap();
        assert_eq!(reply.lines, vec![""]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC nope"])).is_err());
    }

    #[test]
    fn final_line_detection() {
        assert!(is_final_reply_line("250 OK"));
        assert!(is_final_reply_line("354 go ahead"));
        assert!(!is_final_reply_line("250-continues"));
        assert!(!is_final_reply_line("250"));
        assert!(!is_final_reply_line("abcd text"));
    }
}
