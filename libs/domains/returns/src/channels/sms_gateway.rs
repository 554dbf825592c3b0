//! HTTP SMS gateway implementation.

use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_parse, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{SmsOutcome, SmsRequest, SmsSender};
use crate::error::ReturnResult;
use crate::models::{NotificationEvent, ReturnStatus};
use crate::templates::TemplateContext;

/// SMS gateway configuration.
#[derive(Debug, Clone)]
pub struct SmsGatewayConfig {
    /// Endpoint that accepts notification requests.
    pub url: String,
    /// Bearer token, if the gateway wants one.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl SmsGatewayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FromEnv for SmsGatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = SmsGatewayConfig::new(env_required("SMS_GATEWAY_URL")?)
            .with_timeout(Duration::from_secs(env_parse("SMS_GATEWAY_TIMEOUT_SECS", 10)?));
        config.api_key = std::env::var("SMS_GATEWAY_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());
        Ok(config)
    }
}

/// SMS sender that forwards notification requests to an HTTP gateway.
///
/// The gateway looks up the client's number and message template itself; it
/// answers with `{"sent": bool, "error": string?}`.
pub struct HttpSmsGateway {
    config: SmsGatewayConfig,
    client: Client,
}

impl HttpSmsGateway {
    pub fn new(config: SmsGatewayConfig) -> ReturnResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> ReturnResult<Self> {
        Self::new(SmsGatewayConfig::from_env()?)
    }
}

// Gateway request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    reseller_id: i64,
    client_id: i64,
    event: NotificationEvent,
    to_status: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_name: Option<ReturnStatus>,
    template_data: &'a TemplateContext,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    sent: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SmsSender for HttpSmsGateway {
    async fn send(&self, request: &SmsRequest) -> SmsOutcome {
        let body = GatewayRequest {
            reseller_id: request.reseller_id,
            client_id: request.client_id,
            event: request.event,
            to_status: request.to_status,
            status_name: ReturnStatus::try_from(request.to_status).ok(),
            template_data: &request.context,
        };

        debug!(
            reseller_id = request.reseller_id,
            client_id = request.client_id,
            to_status = request.to_status,
            "Sending SMS via gateway"
        );

        let mut http = self.client.post(&self.config.url).json(&body);
        if let Some(api_key) = &self.config.api_key {
            http = http.bearer_auth(api_key);
        }

        let response = match http.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(client_id = request.client_id, error = %e, "SMS gateway unreachable");
                return SmsOutcome::failed(format!("SMS gateway request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(
                client_id = request.client_id,
                status = %status,
                error = %error_body,
                "SMS gateway rejected request"
            );
            return SmsOutcome::failed(format!("SMS gateway error ({})", status));
        }

        match response.json::<GatewayResponse>().await {
            Ok(reply) => {
                let error = reply.error.filter(|message| !message.is_empty());
                info!(
                    client_id = request.client_id,
                    sent = reply.sent,
                    error = ?error,
                    "SMS gateway replied"
                );
                SmsOutcome {
                    sent: reply.sent,
                    error,
                }
            }
            Err(e) => SmsOutcome::failed(format!("Invalid SMS gateway response: {}", e)),
        }
    }

    fn name(&self) -> &'static str {
        "HttpSmsGateway"
    }
}
