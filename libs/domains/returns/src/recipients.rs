//! Sender and recipient resolution for employee notifications.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{ReturnNotificationError, ReturnResult};

/// Identity of whoever triggered the dispatch.
///
/// Passed explicitly so recipient lookup never depends on ambient session
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub reseller_id: i64,
}

impl CallerContext {
    pub fn new(reseller_id: i64) -> Self {
        Self { reseller_id }
    }

    /// Fails unless the caller acts for `reseller_id`.
    pub fn authorize(&self, reseller_id: i64) -> ReturnResult<()> {
        if self.reseller_id != reseller_id {
            return Err(ReturnNotificationError::Unauthorized(format!(
                "caller for reseller {} may not access reseller {}",
                self.reseller_id, reseller_id
            )));
        }
        Ok(())
    }
}

/// Resolves the sender address and permitted employee recipients of a reseller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    /// Sender "from" address. Empty when none is configured.
    async fn sender_address(&self, reseller_id: i64) -> ReturnResult<String>;

    /// Employee emails holding `permission` under `reseller_id`.
    ///
    /// Fails with `Unauthorized` when the caller does not act for the reseller.
    async fn authorized_recipients(
        &self,
        caller: &CallerContext,
        reseller_id: i64,
        permission: &str,
    ) -> ReturnResult<Vec<String>>;
}

/// Resolver backed by in-process maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecipientResolver {
    senders: HashMap<i64, String>,
    recipients: HashMap<(i64, String), Vec<String>>,
}

impl InMemoryRecipientResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, reseller_id: i64, address: impl Into<String>) -> Self {
        self.senders.insert(reseller_id, address.into());
        self
    }

    pub fn with_recipients<I, S>(mut self, reseller_id: i64, permission: &str, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipients
            .entry((reseller_id, permission.to_string()))
            .or_default()
            .extend(emails.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl RecipientResolver for InMemoryRecipientResolver {
    async fn sender_address(&self, reseller_id: i64) -> ReturnResult<String> {
        Ok(self.senders.get(&reseller_id).cloned().unwrap_or_default())
    }

    async fn authorized_recipients(
        &self,
        caller: &CallerContext,
        reseller_id: i64,
        permission: &str,
    ) -> ReturnResult<Vec<String>> {
        caller.authorize(reseller_id)?;

        Ok(self
            .recipients
            .get(&(reseller_id, permission.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
