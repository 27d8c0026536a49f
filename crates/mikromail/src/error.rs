//! Delivery errors and the retry classifier.

use mikromail_mime::MAX_MESSAGE_SIZE;

/// Result type alias for internal delivery steps.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Anything that can go wrong during a send cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Pre-network input validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The assembled message exceeds the size ceiling.
    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_SIZE}-byte limit")]
    MessageTooLarge(usize),

    /// Protocol, transport, authentication, or TLS failure.
    #[error(transparent)]
    Smtp(#[from] mikromail_smtp::Error),

    /// Message assembly failure.
    #[error(transparent)]
    Compose(#[from] mikromail_mime::Error),
}

/// Whether retrying an error can possibly succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retrying cannot help: validation, 5xx, authentication, TLS, size.
    Permanent,
    /// Worth retrying: 4xx replies and network-level failures.
    Transient,
}

/// Classifies an error for the retry loop.
///
/// Typed knowledge comes first: 5xx replies, failed authentication, and
/// TLS errors are permanent; 4xx replies are transient. Untyped failures
/// fall back to the error text: mention of a certificate is permanent,
/// everything else (I/O, timeouts, protocol noise) is worth retrying.
#[must_use]
pub fn classify(error: &Error) -> ErrorClass {
    match error {
        Error::Validation(_) | Error::MessageTooLarge(_) | Error::Compose(_) => {
            ErrorClass::Permanent
        }
        Error::Smtp(smtp) => {
            if smtp.is_permanent() {
                return ErrorClass::Permanent;
            }
            if smtp.is_transient() {
                return ErrorClass::Transient;
            }
            let text = smtp.to_string();
            if text.contains("certificate") || text.contains("Authentication failed") {
                ErrorClass::Permanent
            } else {
                ErrorClass::Transient
            }
        }
    }
}
