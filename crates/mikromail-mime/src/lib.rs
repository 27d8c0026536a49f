//! # mikromail-mime
//!
//! MIME construction for outbound mail: quoted-printable bodies
//! (RFC 2045), RFC 2047 encoded-word headers, injection-safe header
//! sanitization, and single-part or multipart/alternative assembly.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mikromail_mime::MessageBuilder;
//!
//! let message = MessageBuilder::new("sender@example.com")
//!     .to("recipient@example.org")
//!     .subject("Hello")
//!     .text("Plain text version")
//!     .html("<h1>HTML version</h1>")
//!     .id_domain("example.com")
//!     .build()?;
//!
//! // message.as_bytes() is ready for the SMTP DATA phase;
//! // message.message_id carries the generated identifier.
//! # Ok::<(), mikromail_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod encoding;
mod error;
pub mod header;
mod message;

pub use error::{Error, Result};
pub use header::Headers;
pub use message::{ComposedMessage, MAX_MESSAGE_SIZE, MessageBuilder};
