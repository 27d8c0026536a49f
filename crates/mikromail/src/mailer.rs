//! The send orchestrator: validation, delivery attempts, retry policy.

use crate::config::ClientConfiguration;
use crate::error::{Error, ErrorClass, Result, classify};
use crate::message::Email;
use mikromail_mime::{ComposedMessage, MessageBuilder};
use mikromail_smtp::connection::{connect, connect_tls};
use mikromail_smtp::{Address, Client, MailTransaction, RecipientAdded};
use tokio::time::sleep;

/// Outcome of a full send cycle. `Mailer::send` never returns `Err` or
/// panics; every failure folds into the `Failure` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message.
    Success {
        /// Generated Message-ID, including angle brackets.
        message_id: String,
        /// The server's acceptance reply text.
        response: String,
    },
    /// The message was not delivered.
    Failure {
        /// Human-readable description of the final error.
        error: String,
    },
}

impl SendOutcome {
    /// Returns true for a successful delivery.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the Message-ID of a successful delivery.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Success { message_id, .. } => Some(message_id),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the error text of a failed delivery.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

/// One-shot submission client: construct, `send` once, done.
///
/// Each delivery attempt opens its own connection and closes it before
/// the next; nothing is pooled across sends.
#[derive(Debug)]
pub struct Mailer {
    config: ClientConfiguration,
}

/// Validated inputs for one send cycle.
struct DeliveryPlan {
    from: Address,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Option<Address>,
    /// Domain for generated Message-IDs (from the configured account).
    id_domain: String,
    email: Email,
}

struct Delivery {
    message_id: String,
    response: String,
}

impl Mailer {
    /// Creates a mailer over a resolved configuration.
    #[must_use]
    pub const fn new(config: ClientConfiguration) -> Self {
        Self { config }
    }

    /// Returns the configuration this mailer was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfiguration {
        &self.config
    }

    /// Delivers one message, retrying transient failures up to
    /// `max_retries` additional times with `retry_delay` between
    /// attempts. Permanent failures short-circuit.
    pub async fn send(&self, email: &Email) -> SendOutcome {
        let plan = match self.prepare(email) {
            Ok(plan) => plan,
            Err(error) => {
                tracing::error!(%error, "rejecting message before delivery");
                return SendOutcome::Failure {
                    error: error.to_string(),
                };
            }
        };

        let mut last_error: Option<Error> = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::info!(attempt, delay = ?self.config.retry_delay, "retrying delivery");
                sleep(self.config.retry_delay).await;
            }

            match self.attempt(&plan).await {
                Ok(delivery) => {
                    tracing::info!(message_id = %delivery.message_id, "message accepted");
                    return SendOutcome::Success {
                        message_id: delivery.message_id,
                        response: delivery.response,
                    };
                }
                Err(error) => {
                    if classify(&error) == ErrorClass::Permanent {
                        tracing::error!(%error, "permanent delivery failure");
                        return SendOutcome::Failure {
                            error: error.to_string(),
                        };
                    }
                    tracing::warn!(%error, attempt, "transient delivery failure");
                    last_error = Some(error);
                }
            }
        }

        let error = last_error.map_or_else(
            || "delivery failed with no recorded error".to_string(),
            |e| e.to_string(),
        );
        SendOutcome::Failure { error }
    }

    /// Validates the message description against the configuration.
    fn prepare(&self, email: &Email) -> Result<DeliveryPlan> {
        let from_raw = email
            .from
            .clone()
            .unwrap_or_else(|| self.config.user.clone());
        let from = Address::new(from_raw.as_str())
            .map_err(|_| Error::Validation(format!("invalid sender address: {from_raw}")))?;

        if email.to.is_empty() {
            return Err(Error::Validation("no recipients given".into()));
        }
        let mut to = Vec::with_capacity(email.to.len());
        for raw in &email.to {
            let address = Address::new(raw.as_str())
                .map_err(|_| Error::Validation(format!("invalid recipient address: {raw}")))?;
            to.push(address);
        }

        // Secondary recipients are best-effort: bad entries are dropped.
        let cc = skim_valid(&email.cc, "cc");
        let bcc = skim_valid(&email.bcc, "bcc");
        let reply_to = email.reply_to.as_deref().and_then(|raw| {
            Address::new(raw)
                .map_err(|_| {
                    tracing::warn!(address = %raw, "dropping invalid reply-to address");
                })
                .ok()
        });

        if email.subject.is_empty() {
            return Err(Error::Validation("subject must not be empty".into()));
        }
        let has_text = email.text.as_ref().is_some_and(|t| !t.is_empty());
        let has_html = email.html.as_ref().is_some_and(|h| !h.is_empty());
        if !has_text && !has_html {
            return Err(Error::Validation(
                "message needs a text or html body".into(),
            ));
        }

        Ok(DeliveryPlan {
            from,
            to,
            cc,
            bcc,
            reply_to,
            id_domain: id_domain(&self.config.user),
            email: email.clone(),
        })
    }

    /// One full delivery attempt over a fresh connection. Any error
    /// drops the socket; the caller decides whether to try again.
    async fn attempt(&self, plan: &DeliveryPlan) -> Result<Delivery> {
        let message = plan.compose()?;
        if message.exceeds_size_limit() {
            return Err(Error::MessageTooLarge(message.len()));
        }

        let config = &self.config;
        let stream = if config.secure {
            connect_tls(&config.host, config.port, config.timeout).await?
        } else {
            connect(&config.host, config.port, config.timeout).await?
        };

        let client = Client::from_stream(stream, config.timeout, config.debug).await?;
        let mut client = client.ehlo(&config.client_name).await?;

        // Opportunistic upgrade; a server without STARTTLS stays cleartext.
        if !client.is_secure() && client.server_info().supports_starttls() {
            client = client.starttls(&config.host, &config.client_name).await?;
        }

        let transaction = if config.skip_authentication {
            client.mail_from(&plan.from).await?
        } else {
            client
                .authenticate(&config.user, &config.password)
                .await?
                .mail_from(&plan.from)
                .await?
        };

        let client = Self::issue_recipients(transaction, plan).await?;
        let data = client.data().await?;
        let (client, reply) = data.send_message(message.as_bytes()).await?;

        if let Err(error) = client.quit().await {
            tracing::debug!(%error, "QUIT failed after accepted delivery");
        }

        Ok(Delivery {
            message_id: message.message_id,
            response: reply.text(),
        })
    }

    /// Expands the envelope: every primary recipient, then the surviving
    /// carbon-copy and blind-carbon-copy entries.
    async fn issue_recipients(
        transaction: Client<MailTransaction>,
        plan: &DeliveryPlan,
    ) -> Result<Client<RecipientAdded>> {
        let mut recipients = plan.to.iter().chain(&plan.cc).chain(&plan.bcc);

        // `to` is non-empty, so there is always a first recipient.
        let first = recipients
            .next()
            .ok_or_else(|| Error::Validation("no recipients given".into()))?;
        let mut client = transaction.rcpt_to(first).await?;
        for recipient in recipients {
            client = client.rcpt_to(recipient).await?;
        }
        Ok(client)
    }
}

impl DeliveryPlan {
    /// Assembles the RFC 5322 message. Headers carry to, cc, and
    /// reply-to; blind-carbon-copy recipients never reach the builder.
    fn compose(&self) -> Result<ComposedMessage> {
        let mut builder = MessageBuilder::new(self.from.as_str())
            .subject(self.email.subject.as_str())
            .id_domain(self.id_domain.as_str());

        for recipient in &self.to {
            builder = builder.to(recipient.as_str());
        }
        for recipient in &self.cc {
            builder = builder.cc(recipient.as_str());
        }
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.as_str());
        }
        if let Some(text) = self.email.text.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.text(text);
        }
        if let Some(html) = self.email.html.as_deref().filter(|h| !h.is_empty()) {
            builder = builder.html(html);
        }
        for (name, value) in &self.email.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(builder.build()?)
    }
}

/// Drops invalid secondary recipients with a warning.
fn skim_valid(raw: &[String], kind: &str) -> Vec<Address> {
    raw.iter()
        .filter_map(|candidate| match Address::new(candidate.as_str()) {
            Ok(address) => Some(address),
            Err(_) => {
                tracing::warn!(kind, address = %candidate, "dropping invalid recipient");
                None
            }
        })
        .collect()
}

/// Domain for generated Message-IDs: the configured account's domain,
/// or `localhost` when the account carries none.
fn id_domain(user: &str) -> String {
    user.rsplit_once('@')
        .map_or_else(|| "localhost".to_string(), |(_, domain)| domain.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> ClientConfiguration {
        ClientConfiguration::builder()
            .host("smtp.example.com")
            .user("account@example.com")
            .password("secret")
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    fn valid_email() -> Email {
        Email::new()
            .to("rcpt@example.org")
            .subject("subject")
            .text("body")
    }

    #[test]
    fn prepare_defaults_from_to_config_user() {
        let mailer = Mailer::new(config());
        let plan = mailer.prepare(&valid_email()).unwrap();
        assert_eq!(plan.from.as_str(), "account@example.com");
    }

    #[test]
    fn prepare_rejects_invalid_sender_and_recipient() {
        let mailer = Mailer::new(config());

        let bad_from = valid_email().from("not-an-address");
        assert!(matches!(
            mailer.prepare(&bad_from),
            Err(Error::Validation(_))
        ));

        let bad_to = Email::new()
            .to("broken@@example.org")
            .subject("s")
            .text("b");
        assert!(matches!(mailer.prepare(&bad_to), Err(Error::Validation(_))));
    }

    #[test]
    fn prepare_skims_invalid_secondary_recipients() {
        let mailer = Mailer::new(config());
        let email = valid_email()
            .cc("ok@example.org")
            .cc("broken@@example.org")
            .bcc("also-broken")
            .bcc("fine@example.org")
            .reply_to("nope");
        let plan = mailer.prepare(&email).unwrap();
        assert_eq!(plan.cc.len(), 1);
        assert_eq!(plan.bcc.len(), 1);
        assert!(plan.reply_to.is_none());
    }

    #[test]
    fn prepare_requires_subject_and_body() {
        let mailer = Mailer::new(config());

        let no_subject = Email::new().to("rcpt@example.org").text("b");
        assert!(matches!(
            mailer.prepare(&no_subject),
            Err(Error::Validation(_))
        ));

        let no_body = Email::new().to("rcpt@example.org").subject("s");
        assert!(matches!(mailer.prepare(&no_body), Err(Error::Validation(_))));

        let empty_bodies = Email::new()
            .to("rcpt@example.org")
            .subject("s")
            .text("")
            .html("");
        assert!(matches!(
            mailer.prepare(&empty_bodies),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn composed_plan_omits_bcc() {
        let mailer = Mailer::new(config());
        let email = valid_email().bcc("hidden@example.org");
        let plan = mailer.prepare(&email).unwrap();
        let message = plan.compose().unwrap();
        let wire = String::from_utf8(message.as_bytes().to_vec()).unwrap();
        assert!(!wire.contains("hidden@example.org"));
        assert!(!wire.contains("Bcc:"));
    }

    #[test]
    fn message_id_uses_account_domain() {
        assert_eq!(id_domain("user@example.com"), "example.com");
        assert_eq!(id_domain("user"), "localhost");
        assert_eq!(id_domain(""), "localhost");
    }
}
