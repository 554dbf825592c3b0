//! Outbound channels for return notifications.
//!
//! This module contains the `EmailSender` and `SmsSender` traits and their
//! network-backed implementations.

mod sms_gateway;
mod smtp;

pub use sms_gateway::{HttpSmsGateway, SmsGatewayConfig};
pub use smtp::{SmtpConfig, SmtpEmailSender};

use async_trait::async_trait;

use crate::error::ReturnResult;
use crate::models::NotificationEvent;
use crate::templates::TemplateContext;

/// A rendered email ready for submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Represents an accepted email with transport-specific message ID.
#[derive(Debug, Clone, Default)]
pub struct SentEmail {
    pub message_id: Option<String>,
}

/// Trait for email transports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Submit one email.
    async fn send(&self, email: &OutgoingEmail) -> ReturnResult<SentEmail>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}

/// Client SMS notification request.
#[derive(Debug, Clone)]
pub struct SmsRequest {
    pub reseller_id: i64,
    pub client_id: i64,
    pub event: NotificationEvent,
    pub to_status: i64,
    pub context: TemplateContext,
}

/// What the SMS channel reported.
///
/// `error` may be set even when `sent` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsOutcome {
    pub sent: bool,
    pub error: Option<String>,
}

impl SmsOutcome {
    pub fn delivered() -> Self {
        Self {
            sent: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            sent: false,
            error: Some(error.into()),
        }
    }
}

/// Trait for SMS transports. Failures are reported in the outcome, never
/// raised.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, request: &SmsRequest) -> SmsOutcome;

    fn name(&self) -> &'static str;
}
