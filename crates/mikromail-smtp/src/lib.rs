//! # mikromail-smtp
//!
//! SMTP submission protocol engine implementing RFC 5321 for outbound
//! delivery.
//!
//! ## Features
//!
//! - **Type-state session management**: compile-time enforcement of the
//!   EHLO → [STARTTLS] → [AUTH] → MAIL → RCPT → DATA command order
//! - **Transport**: plain TCP, implicit TLS (RFC 8314), and in-place
//!   STARTTLS upgrade (RFC 3207) with certificate verification always on
//! - **Authentication**: CRAM-MD5, LOGIN, and PLAIN (RFC 4954), picking
//!   the strongest mechanism the server advertises
//! - **Timeouts**: every connect and command/reply round trip is bounded
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use mikromail_smtp::{Address, Client};
//! use mikromail_smtp::connection::connect;
//!
//! # async fn run() -> mikromail_smtp::Result<()> {
//! let timeout = Duration::from_secs(10);
//! let stream = connect("smtp.example.com", 587, timeout).await?;
//!
//! let client = Client::from_stream(stream, timeout, false).await?;
//! let client = client.ehlo("workstation.example.com").await?;
//! let client = client
//!     .starttls("smtp.example.com", "workstation.example.com")
//!     .await?;
//! let client = client.authenticate("user@example.com", "password").await?;
//!
//! let from = Address::new("user@example.com")?;
//! let to = Address::new("friend@example.org")?;
//!
//! let client = client.mail_from(&from).await?;
//! let client = client.rcpt_to(&to).await?;
//! let client = client.data().await?;
//! let (client, _accepted) = client
//!     .send_message(b"Subject: Hi\r\n\r\nHello!\r\n")
//!     .await?;
//!
//! client.quit().await
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode, is_valid_address};
