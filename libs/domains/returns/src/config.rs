//! Service-level configuration for return notifications.

use core_config::{ConfigError, FromEnv, env_or_default, env_parse};

/// Permission employees need to receive return notifications.
pub const DEFAULT_PERMISSION_TAG: &str = "tsGoodsReturn";

/// Configuration for the return notification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnNotifierConfig {
    /// Permission tag used to look up employee recipients.
    pub permission_tag: String,
    /// Upper bound on employee emails in flight at once. 1 sends sequentially.
    pub max_concurrent_sends: usize,
}

impl Default for ReturnNotifierConfig {
    fn default() -> Self {
        Self {
            permission_tag: DEFAULT_PERMISSION_TAG.to_string(),
            max_concurrent_sends: 4,
        }
    }
}

impl ReturnNotifierConfig {
    pub fn with_max_concurrent_sends(mut self, limit: usize) -> Self {
        self.max_concurrent_sends = limit.max(1);
        self
    }
}

impl FromEnv for ReturnNotifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            permission_tag: env_or_default("RETURNS_PERMISSION_TAG", &defaults.permission_tag),
            ..defaults
        };
        Ok(config.with_max_concurrent_sends(env_parse(
            "RETURNS_MAX_CONCURRENT_SENDS",
            defaults.max_concurrent_sends,
        )?))
    }
}
