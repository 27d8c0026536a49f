//! # mikromail
//!
//! Minimal outbound SMTP submission client.
//!
//! Builds an RFC 5322 message from a structured description and delivers
//! it to a configured submission server, negotiating TLS (implicit or
//! STARTTLS) and authentication (CRAM-MD5, LOGIN, PLAIN), and retrying
//! transient failures with a configurable delay.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mikromail::{ClientConfiguration, Email, send_mail};
//!
//! # async fn run() {
//! let config = ClientConfiguration::builder()
//!     .host("smtp.example.com")
//!     .user("account@example.com")
//!     .password("password")
//!     .secure(true)
//!     .build()
//!     .expect("host is set");
//!
//! let email = Email::new()
//!     .to("friend@example.org")
//!     .subject("Hello")
//!     .text("Plain text body")
//!     .html("<p>HTML body</p>");
//!
//! let outcome = send_mail(config, &email).await;
//! if let Some(message_id) = outcome.message_id() {
//!     println!("delivered as {message_id}");
//! }
//! # }
//! ```
//!
//! ## Configuration layers
//!
//! [`ClientConfiguration::builder`] merges three source layers, lowest
//! to highest precedence: programmatic values, the JSON file
//! (`mikromail.config.json` by default, see
//! [`config::DEFAULT_CONFIG_FILE`]), and CLI override tokens.
//!
//! ## Crates
//!
//! The wire protocol lives in `mikromail-smtp`, message construction in
//! `mikromail-mime`; this crate adds configuration, validation, the
//! retry loop, and the one-call façade.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod mailer;
mod message;
pub mod mx;

pub use config::{ClientConfiguration, ConfigBuilder, ConfigError, DEFAULT_CONFIG_FILE};
pub use error::{Error, ErrorClass, classify};
pub use mailer::{Mailer, SendOutcome};
pub use message::Email;

/// Sends one message and reports the outcome.
///
/// The façade entry point: runs the best-effort MX warning pass over
/// every recipient, performs a single send cycle (with the configured
/// retry policy), logs the outcome, and always closes the connection
/// before returning. Never panics and never returns an error; failures
/// are reported inside the outcome.
pub async fn send_mail(config: ClientConfiguration, email: &Email) -> SendOutcome {
    let mut recipients = email.to.clone();
    recipients.extend(email.cc.iter().cloned());
    recipients.extend(email.bcc.iter().cloned());
    mx::warn_missing_mx(&recipients).await;

    let outcome = Mailer::new(config).send(email).await;
    match &outcome {
        SendOutcome::Success { message_id, .. } => {
            tracing::info!(%message_id, "message sent");
        }
        SendOutcome::Failure { error } => {
            tracing::error!(%error, "message not sent");
        }
    }
    outcome
}
