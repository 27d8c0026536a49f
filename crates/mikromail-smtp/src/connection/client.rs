//! Type-state SMTP submission client.
//!
//! State markers encode the legal command order at compile time:
//! a `RCPT TO` cannot be issued before `MAIL FROM`, and message content
//! cannot be written outside the `DATA` phase.

use super::{ServerInfo, SmtpStream};
use crate::auth;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_final_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::timeout;

/// State marker: greeting consumed, EHLO possible.
#[derive(Debug)]
pub struct Connected;

/// State marker: SASL exchange completed.
#[derive(Debug)]
pub struct Authenticated;

/// State marker: mail transaction open.
#[derive(Debug)]
pub struct MailTransaction;

/// State marker: at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// State marker: DATA accepted, server expects content.
#[derive(Debug)]
pub struct Data;

/// SMTP client parameterized over the session state.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    command_timeout: Duration,
    log_dialogue: bool,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Consumes the server greeting on a fresh stream.
    ///
    /// The greeting must arrive within `command_timeout` and carry code
    /// 220; anything else fails the session.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, or a non-220 greeting.
    pub async fn from_stream(
        stream: SmtpStream,
        command_timeout: Duration,
        log_dialogue: bool,
    ) -> Result<Self> {
        let mut client = Self {
            stream,
            server_info: ServerInfo::default(),
            command_timeout,
            log_dialogue,
            _state: PhantomData,
        };

        let greeting = client.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(greeting.code.as_u16(), greeting.text()));
        }

        client.server_info.hostname = greeting
            .first_line()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(client)
    }

    /// Sends EHLO and records the advertised capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the greeting.
    pub async fn ehlo(mut self, client_name: &str) -> Result<Self> {
        let reply = self
            .send_command(&Command::Ehlo {
                client_name: client_name.to_string(),
            })
            .await?;
        if reply.code != ReplyCode::OK {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.text()));
        }

        self.server_info.extensions = parse_capabilities(&reply);
        Ok(self)
    }

    /// Upgrades the session to TLS via STARTTLS, then re-issues EHLO as
    /// required by RFC 3207 (capabilities may change under encryption).
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is rejected, the TLS handshake or
    /// certificate verification fails, or the second EHLO is rejected.
    pub async fn starttls(mut self, tls_hostname: &str, client_name: &str) -> Result<Self> {
        let reply = self.send_command(&Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.text()));
        }

        self.stream = self.stream.upgrade_to_tls(tls_hostname).await?;
        self.ehlo(client_name).await
    }

    /// Runs the SASL exchange, choosing the strongest advertised
    /// mechanism (CRAM-MD5, then LOGIN, then PLAIN; PLAIN when nothing
    /// was advertised).
    ///
    /// # Errors
    ///
    /// Any failure in the exchange is an authentication error, which
    /// callers must treat as permanent.
    pub async fn authenticate(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let mechanism = auth::select_mechanism(&self.server_info.auth_mechanisms());

        match mechanism {
            AuthMechanism::Plain => {
                let reply = self
                    .send_command(&Command::Auth {
                        mechanism,
                        initial_response: Some(auth::plain_initial_response(username, password)),
                    })
                    .await?;
                check_auth_step(&reply, ReplyCode::AUTH_SUCCEEDED)?;
            }
            AuthMechanism::Login => {
                let reply = self
                    .send_command(&Command::Auth {
                        mechanism,
                        initial_response: None,
                    })
                    .await?;
                check_auth_step(&reply, ReplyCode::AUTH_CONTINUE)?;

                let reply = self
                    .send_command(&Command::AuthResponse(auth::login_response(username)))
                    .await?;
                check_auth_step(&reply, ReplyCode::AUTH_CONTINUE)?;

                let reply = self
                    .send_command(&Command::AuthResponse(auth::login_response(password)))
                    .await?;
                check_auth_step(&reply, ReplyCode::AUTH_SUCCEEDED)?;
            }
            AuthMechanism::CramMd5 => {
                let reply = self
                    .send_command(&Command::Auth {
                        mechanism,
                        initial_response: None,
                    })
                    .await?;
                check_auth_step(&reply, ReplyCode::AUTH_CONTINUE)?;

                let answer = auth::cram_md5_response(username, password, reply.first_line())?;
                let reply = self.send_command(&Command::AuthResponse(answer)).await?;
                check_auth_step(&reply, ReplyCode::AUTH_SUCCEEDED)?;
            }
        }

        Ok(self.into_state())
    }

    /// Opens a mail transaction without authenticating first.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sender.
    pub async fn mail_from(mut self, from: &Address) -> Result<Client<MailTransaction>> {
        let reply = self
            .send_command(&Command::MailFrom { from: from.clone() })
            .await?;
        if reply.code != ReplyCode::OK {
            return Err(self.fail_transaction(reply).await);
        }
        Ok(self.into_state())
    }
}

impl Client<Authenticated> {
    /// Opens a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sender.
    pub async fn mail_from(mut self, from: &Address) -> Result<Client<MailTransaction>> {
        let reply = self
            .send_command(&Command::MailFrom { from: from.clone() })
            .await?;
        if reply.code != ReplyCode::OK {
            return Err(self.fail_transaction(reply).await);
        }
        Ok(self.into_state())
    }
}

impl Client<MailTransaction> {
    /// Adds the first envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(&Command::RcptTo { to: to.clone() }).await?;
        if reply.code != ReplyCode::OK {
            return Err(self.fail_transaction(reply).await);
        }
        Ok(self.into_state())
    }
}

impl Client<RecipientAdded> {
    /// Adds a further envelope recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Self> {
        let reply = self.send_command(&Command::RcptTo { to: to.clone() }).await?;
        if reply.code != ReplyCode::OK {
            return Err(self.fail_transaction(reply).await);
        }
        Ok(self)
    }

    /// Issues DATA, switching the server to content mode.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(&Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(self.fail_transaction(reply).await);
        }
        Ok(self.into_state())
    }
}

impl Client<Data> {
    /// Transmits the message content and the terminating dot, returning
    /// the server's acceptance reply alongside the idle client.
    ///
    /// Line endings are normalized to CRLF and lines starting with a dot
    /// are dot-stuffed per RFC 5321 section 4.5.2.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not accept the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<(Client<Connected>, Reply)> {
        let mut wire = Vec::with_capacity(message.len() + 64);
        for line in message.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                wire.push(b'.');
            }
            wire.extend_from_slice(line);
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b".\r\n");

        if self.log_dialogue {
            tracing::debug!(bytes = wire.len(), "transmitting message content");
        }
        self.stream.write_all(&wire).await?;

        let reply = self.read_reply().await?;
        if reply.code != ReplyCode::OK {
            return Err(self.fail_transaction(reply).await);
        }
        Ok((self.into_state(), reply))
    }
}

impl<S> Client<S> {
    /// Returns the server identity and capabilities.
    #[must_use]
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true once the underlying stream is encrypted.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.stream.is_tls()
    }

    /// Sends QUIT and drops the connection. Available from any state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server answers with something other than
    /// a success code or 221.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.text()));
        }
        Ok(())
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        if self.log_dialogue {
            tracing::debug!(command = %cmd.redacted(), "C");
        }
        self.stream.write_all(&cmd.serialize()).await?;

        let reply = self.read_reply().await?;
        if self.log_dialogue {
            tracing::debug!(code = %reply.code, text = %reply.first_line(), "S");
        }
        Ok(reply)
    }

    /// Accumulates response lines until the terminator line (space after
    /// the code), bounded by the per-command timeout. A timeout destroys
    /// the session.
    async fn read_reply(&mut self) -> Result<Reply> {
        let limit = self.command_timeout;
        timeout(limit, async {
            let mut lines = Vec::new();
            loop {
                let line = self.stream.read_line().await?;
                if line.is_empty() {
                    continue;
                }
                let done = is_final_reply_line(&line);
                lines.push(line);
                if done {
                    break;
                }
            }
            parse_reply(&lines)
        })
        .await
        .map_err(|_| Error::Timeout(limit))?
    }

    /// Converts a rejected envelope reply into an error. For transient
    /// rejections the transaction is first reset best-effort so a retry
    /// can reuse a clean session if the caller reconnects mid-stream.
    async fn fail_transaction(mut self, reply: Reply) -> Error {
        if reply.is_transient_error() {
            let _ = self.send_command(&Command::Rset).await;
        }
        Error::smtp_error(reply.code.as_u16(), reply.text())
    }

    fn into_state<Next>(self) -> Client<Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            command_timeout: self.command_timeout,
            log_dialogue: self.log_dialogue,
            _state: PhantomData,
        }
    }
}

/// Extracts the capability set from an EHLO reply, skipping the first
/// line (the server's greeting text).
fn parse_capabilities(reply: &Reply) -> HashSet<Extension> {
    reply
        .lines
        .iter()
        .skip(1)
        .map(|line| Extension::parse(line))
        .collect()
}

fn check_auth_step(reply: &Reply, expected: ReplyCode) -> Result<()> {
    if reply.code == expected {
        Ok(())
    } else {
        Err(Error::AuthenticationFailed(format!(
            "{} {}",
            reply.code,
            reply.text()
        )))
    }
}
