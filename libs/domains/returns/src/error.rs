//! Error types for the returns notification domain.

use core_config::ConfigError;
use strum::Display;
use thiserror::Error;

/// Result type for return notification operations.
pub type ReturnResult<T> = Result<T, ReturnNotificationError>;

/// The party a directory lookup was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PartyRole {
    Reseller,
    Client,
    Creator,
    Expert,
}

/// Errors that can occur while dispatching a return notification.
#[derive(Debug, Error)]
pub enum ReturnNotificationError {
    /// A mandatory request field is missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced party does not exist or may not be addressed.
    #[error("{0} not found")]
    NotFound(PartyRole),

    /// Data assembled for rendering is incomplete.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The caller may not act for the requested reseller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Directory backend failure.
    #[error("Directory error: {0}")]
    Directory(String),

    /// Email or SMS transport failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Template registration or rendering failure.
    #[error("Template error: {0}")]
    Template(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReturnNotificationError {
    /// HTTP-style status code for handlers that surface this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ReturnNotificationError::InvalidArgument(_) | ReturnNotificationError::NotFound(_) => {
                400
            }
            ReturnNotificationError::Unauthorized(_) => 401,
            ReturnNotificationError::InvalidState(_)
            | ReturnNotificationError::Directory(_)
            | ReturnNotificationError::Provider(_)
            | ReturnNotificationError::Template(_)
            | ReturnNotificationError::Config(_) => 500,
        }
    }
}

impl From<handlebars::RenderError> for ReturnNotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        ReturnNotificationError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for ReturnNotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        ReturnNotificationError::Template(err.to_string())
    }
}

impl From<reqwest::Error> for ReturnNotificationError {
    fn from(err: reqwest::Error) -> Self {
        ReturnNotificationError::Provider(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for ReturnNotificationError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        ReturnNotificationError::Provider(format!("SMTP error: {}", err))
    }
}
