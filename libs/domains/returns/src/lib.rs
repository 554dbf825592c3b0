//! Returns Domain
//!
//! Notification dispatch for return (complaint) records. When a return is
//! created or changes status, the service tells the reseller's employees by
//! email and, on a status change, tells the client by email and SMS.
//!
//! # Features
//!
//! - Lenient decoding of loosely typed change payloads
//! - Party resolution with reseller ownership checks
//! - Thirteen-field template context, rejected when any field is empty
//! - Per-reseller template overrides
//! - Bounded-concurrency employee fan-out with per-recipient results
//! - SMTP email and HTTP SMS gateway transports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Change event   │  ← NotificationRequest + CallerContext
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ ReturnNotifSvc  │  ← validates, resolves parties, builds context
//! └───┬─────────┬───┘
//!     │         │
//! ┌───▼───┐ ┌───▼──────────┐
//! │ Email │ │ SMS gateway  │  ← SMTP, HTTP
//! └───────┘ └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_returns::{
//!     CallerContext, NotificationRequest, ReturnNotificationService, ReturnNotifierConfig,
//!     TemplateEngine,
//!     channels::{HttpSmsGateway, SmtpEmailSender},
//! };
//!
//! let service = ReturnNotificationService::new(
//!     directory,
//!     recipients,
//!     TemplateEngine::new()?,
//!     SmtpEmailSender::from_env()?,
//!     HttpSmsGateway::from_env()?,
//!     ReturnNotifierConfig::from_env()?,
//! );
//!
//! let request = NotificationRequest::from_payload(payload)?;
//! let result = service.execute(&CallerContext::new(reseller_id), &request).await?;
//! ```

pub mod channels;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod parties;
pub mod recipients;
pub mod service;
pub mod templates;

// Re-export commonly used types
pub use channels::{EmailSender, OutgoingEmail, SmsOutcome, SmsRequest, SmsSender};
pub use config::ReturnNotifierConfig;
pub use directory::{Directory, InMemoryDirectory};
pub use error::{PartyRole, ReturnNotificationError, ReturnResult};
pub use models::{
    ClientSmsResult, DispatchResult, NotificationEvent, NotificationKind, NotificationRequest,
    RecipientDelivery, ReturnStatus, StatusTransition,
};
pub use parties::{Contractor, ContractorKind, ResolvedParties};
pub use recipients::{CallerContext, InMemoryRecipientResolver, RecipientResolver};
pub use service::ReturnNotificationService;
pub use templates::{TemplateContext, TemplateEngine, TemplateKey, TemplateRenderer};
