//! Error types for message construction.

/// Result type alias for message construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Message construction error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither a text nor an HTML body was supplied.
    #[error("message has no body: supply text, html, or both")]
    MissingBody,

    /// No recipient was supplied for the To header.
    #[error("message has no recipients")]
    MissingRecipients,
}
