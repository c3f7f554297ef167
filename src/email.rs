//! Outbound notifications for the verification and password-reset flows.
//!
//! Delivery is synchronous from the caller's point of view: the orchestrator
//! awaits `send` and a failure fails the request. `SmtpEmailSender` relays
//! through STARTTLS; `LogEmailSender` only logs and is used when no SMTP host is
//! configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver a message; an error fails the flow that triggered it.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs instead of delivering.
#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl NotificationSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    from: String,
}

impl SmtpConfig {
    /// Defaults to port 587 and no credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
            from: from.into(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// # Errors
    /// Returns an error if the sender address or relay host is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid SMTP from address: {}", config.from))?;

        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("failed to configure SMTP relay {}", config.host))?
            .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            )),
            _ => {
                warn!("SMTP credentials not configured; relaying unauthenticated");
                builder
            }
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl NotificationSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let to = message
            .to_email
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient address: {}", message.to_email))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .context("failed to build email")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email")?;

        info!(to_email = %message.to_email, subject = %message.subject, "email sent");
        Ok(())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[must_use]
pub fn verification_email(to_email: &str, username: &str, link: &str) -> EmailMessage {
    let username = escape_html(username);
    let link = escape_html(link);
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Email verification".to_string(),
        html_body: format!(
            r#"<!DOCTYPE html>
<html>
<body>
    <p>Hi {username},</p>
    <p>Thanks for signing up. Please confirm your email address:</p>
    <p><a href="{link}">Verify email</a></p>
    <p>If the button doesn't work, copy this link into your browser:<br>{link}</p>
</body>
</html>"#
        ),
    }
}

#[must_use]
pub fn password_reset_email(to_email: &str, link: &str) -> EmailMessage {
    let link = escape_html(link);
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Password reset".to_string(),
        html_body: format!(
            r#"<!DOCTYPE html>
<html>
<body>
    <p>We received a request to reset your password.</p>
    <p><a href="{link}">Reset password</a></p>
    <p>If you did not request this, you can ignore this email.</p>
</body>
</html>"#
        ),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_greets_and_links() {
        let message = verification_email(
            "a@x.com",
            "alice",
            "https://app.test/verify?token=abc",
        );
        assert_eq!(message.to_email, "a@x.com");
        assert_eq!(message.subject, "Email verification");
        assert!(message.html_body.contains("Hi alice,"));
        assert!(message.html_body.contains("https://app.test/verify?token=abc"));
    }

    #[test]
    fn password_reset_email_links() {
        let message = password_reset_email("a@x.com", "https://app.test/reset?token=abc");
        assert_eq!(message.subject, "Password reset");
        assert!(message.html_body.contains("https://app.test/reset?token=abc"));
    }

    #[test]
    fn username_markup_is_escaped() {
        let message = verification_email("a@x.com", "<b>eve</b>", "https://app.test/v?token=t");
        assert!(message.html_body.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(!message.html_body.contains("<b>eve"));
    }

    #[test]
    fn smtp_config_builder() {
        let config = SmtpConfig::new("smtp.test", "Synthesizer <noreply@synthesizer.dev>")
            .with_port(2525)
            .with_credentials("user", SecretString::from("pass".to_string()));
        assert_eq!(config.host(), "smtp.test");
        assert_eq!(config.port(), 2525);
        assert!(!format!("{config:?}").contains("\"pass\""));
    }

    #[test]
    fn smtp_sender_rejects_bad_from_address() {
        let config = SmtpConfig::new("smtp.test", "not an address");
        assert!(SmtpEmailSender::new(&config).is_err());
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() -> Result<()> {
        LogEmailSender
            .send(&password_reset_email("a@x.com", "https://app.test/r?token=t"))
            .await
    }
}
