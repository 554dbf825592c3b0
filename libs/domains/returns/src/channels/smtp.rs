//! SMTP email sender implementation using lettre.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_flag, env_or_default, env_parse};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, error, info};

use super::{EmailSender, OutgoingEmail, SentEmail};
use crate::error::{ReturnNotificationError, ReturnResult};

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// SMTP username (optional for dev servers like Mailpit).
    pub username: Option<String>,
    /// SMTP password (optional for dev servers like Mailpit).
    pub password: Option<String>,
    /// Whether to use TLS (false for local dev servers).
    pub use_tls: bool,
    /// Per-connection timeout.
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Create a new SMTP configuration without TLS or credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            use_tls: false,
            timeout: Duration::from_secs(30),
        }
    }

    /// Builder method to set TLS.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FromEnv for SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = SmtpConfig::new(
            env_or_default("SMTP_HOST", "localhost"),
            env_parse("SMTP_PORT", 1025)?,
        )
        .with_tls(env_flag("SMTP_USE_TLS", false))
        .with_timeout(Duration::from_secs(env_parse("SMTP_TIMEOUT_SECS", 30)?));

        config.username = std::env::var("SMTP_USERNAME").ok();
        config.password = std::env::var("SMTP_PASSWORD").ok();
        Ok(config)
    }
}

/// Email sender that submits messages to an SMTP relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> ReturnResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    pub fn from_env() -> ReturnResult<Self> {
        Self::new(SmtpConfig::from_env()?)
    }

    /// Build the SMTP transport based on configuration.
    fn build_transport(config: &SmtpConfig) -> ReturnResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            // Plain transport for local relays like Mailpit
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port)
        .timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Build a plain-text lettre Message.
    fn build_message(email: &OutgoingEmail) -> ReturnResult<Message> {
        let from: Mailbox = email.from.parse().map_err(|e| {
            ReturnNotificationError::Provider(format!("Invalid from address '{}': {}", email.from, e))
        })?;
        let to: Mailbox = email.to.parse().map_err(|e| {
            ReturnNotificationError::Provider(format!("Invalid to address '{}': {}", email.to, e))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| {
                ReturnNotificationError::Provider(format!("Failed to build email message: {}", e))
            })
    }

    pub async fn health_check(&self) -> ReturnResult<bool> {
        Ok(self.transport.test_connection().await?)
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> ReturnResult<SentEmail> {
        debug!(
            to = %email.to,
            subject = %email.subject,
            host = %self.config.host,
            port = %self.config.port,
            "Sending email via SMTP"
        );

        let message = Self::build_message(email)?;

        let response = self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to, error = %e, "Failed to send email via SMTP");
            ReturnNotificationError::from(e)
        })?;

        let message_id = response.message().next().map(|s| s.to_string());

        info!(to = %email.to, message_id = ?message_id, "Email sent via SMTP");

        Ok(SentEmail { message_id })
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }
}
