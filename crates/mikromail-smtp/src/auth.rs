//! SASL payload construction and mechanism selection.
//!
//! The client picks the strongest mechanism the server advertises
//! (CRAM-MD5, then LOGIN, then PLAIN) and falls back to PLAIN when no
//! AUTH capability line was seen at all.

use crate::error::{Error, Result};
use crate::types::AuthMechanism;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;
use std::fmt::Write as _;

type HmacMd5 = Hmac<Md5>;

/// Selects the mechanism to use from the advertised list.
#[must_use]
pub fn select_mechanism(advertised: &[AuthMechanism]) -> AuthMechanism {
    advertised
        .iter()
        .copied()
        .max()
        .unwrap_or(AuthMechanism::Plain)
}

/// Builds the PLAIN initial response: `base64(NUL user NUL password)`.
#[must_use]
pub fn plain_initial_response(username: &str, password: &str) -> String {
    STANDARD.encode(format!("\0{username}\0{password}"))
}

/// Encodes one LOGIN continuation line (username or password).
#[must_use]
pub fn login_response(value: &str) -> String {
    STANDARD.encode(value)
}

/// Answers a CRAM-MD5 challenge (RFC 2195).
///
/// The server's 334 reply carries a base64 challenge; the answer is
/// `base64("<user> <hex>")` where `<hex>` is the lowercase hex HMAC-MD5
/// digest of the decoded challenge keyed on the password.
///
/// # Errors
///
/// Returns an authentication error when the challenge is not valid base64.
pub fn cram_md5_response(username: &str, password: &str, challenge_b64: &str) -> Result<String> {
    let challenge = STANDARD
        .decode(challenge_b64.trim())
        .map_err(|e| Error::AuthenticationFailed(format!("bad CRAM-MD5 challenge: {e}")))?;

    let mut mac = HmacMd5::new_from_slice(password.as_bytes())
        .map_err(|e| Error::AuthenticationFailed(format!("bad CRAM-MD5 key: {e}")))?;
    mac.update(&challenge);

    let digest = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }

    Ok(STANDARD.encode(format!("{username} {hex}")))
}
