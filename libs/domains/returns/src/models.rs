//! Data models for return notifications.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::error::{ReturnNotificationError, ReturnResult};

// ============================================================================
// Request
// ============================================================================

/// Kind of change that triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A new position was added to the return.
    New,
    /// An existing position changed.
    Change,
    /// Any other non-zero code. Passes the kind check but never yields a
    /// differences label.
    Other(i64),
}

impl NotificationKind {
    pub const NEW_CODE: i64 = 1;
    pub const CHANGE_CODE: i64 = 2;

    /// Maps a wire code to a kind. Zero means "not set".
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => None,
            Self::NEW_CODE => Some(NotificationKind::New),
            Self::CHANGE_CODE => Some(NotificationKind::Change),
            other => Some(NotificationKind::Other(other)),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            NotificationKind::New => Self::NEW_CODE,
            NotificationKind::Change => Self::CHANGE_CODE,
            NotificationKind::Other(code) => *code,
        }
    }
}

/// Status transition carried by change events.
///
/// `populated` records whether the payload carried any transition data at
/// all. A transition object whose values are all null still counts as
/// present; an empty one does not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: Option<i64>,
    pub to: Option<i64>,
    populated: bool,
}

impl StatusTransition {
    /// A transition that is present in the event, whatever its values.
    pub fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self {
            from,
            to,
            populated: true,
        }
    }

    /// True when the event carried no transition data.
    pub fn is_empty(&self) -> bool {
        !self.populated
    }

    /// The target status, if it is a concrete (non-zero) id.
    pub fn target(&self) -> Option<i64> {
        self.to.filter(|status| *status != 0)
    }
}

/// Raw change event on a return/complaint record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub reseller_id: Option<i64>,
    #[serde(
        default,
        rename = "notificationType",
        alias = "notificationKind",
        deserialize_with = "lenient::notification_kind"
    )]
    pub notification_kind: Option<NotificationKind>,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub client_id: i64,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub creator_id: i64,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub expert_id: i64,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub complaint_id: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub complaint_number: String,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub consumption_id: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub consumption_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub agreement_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: String,
    #[serde(default, rename = "differences", deserialize_with = "lenient::transition")]
    pub status_transition: Option<StatusTransition>,
}

impl NotificationRequest {
    /// Decodes the loosely typed payload an upstream handler received.
    pub fn from_payload(payload: serde_json::Value) -> ReturnResult<Self> {
        serde_json::from_value(payload).map_err(|e| {
            ReturnNotificationError::InvalidArgument(format!("malformed request payload: {}", e))
        })
    }

    /// Reseller id when it is set and positive.
    pub fn valid_reseller_id(&self) -> Option<i64> {
        self.reseller_id.filter(|id| *id > 0)
    }

    /// Target status for client notifications, if the event carries one.
    pub fn target_status(&self) -> Option<i64> {
        self.status_transition.as_ref().and_then(StatusTransition::target)
    }

    /// Whether the event carries any transition data.
    pub fn has_differences(&self) -> bool {
        self.status_transition
            .as_ref()
            .is_some_and(|transition| !transition.is_empty())
    }
}

// ============================================================================
// Statuses and events
// ============================================================================

/// Lifecycle status of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReturnStatus {
    Completed,
    Pending,
    Rejected,
}

impl ReturnStatus {
    pub fn id(&self) -> i64 {
        match self {
            ReturnStatus::Completed => 0,
            ReturnStatus::Pending => 1,
            ReturnStatus::Rejected => 2,
        }
    }

    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

impl TryFrom<i64> for ReturnStatus {
    type Error = ReturnNotificationError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(ReturnStatus::Completed),
            1 => Ok(ReturnStatus::Pending),
            2 => Ok(ReturnStatus::Rejected),
            other => Err(ReturnNotificationError::InvalidArgument(format!(
                "invalid status id {}",
                other
            ))),
        }
    }
}

/// Event names understood by the message transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum NotificationEvent {
    ChangeReturnStatus,
    NewReturnStatus,
}

impl NotificationEvent {
    pub fn for_kind(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::New => NotificationEvent::NewReturnStatus,
            _ => NotificationEvent::ChangeReturnStatus,
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Message put into the SMS sub-result when the reseller id is unusable.
pub const EMPTY_RESELLER_MESSAGE: &str = "Empty resellerId";

/// Outcome of the client SMS channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientSmsResult {
    pub sent: bool,
    pub message: String,
}

/// Outcome of one employee email submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientDelivery {
    pub recipient: String,
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated outcome of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub employee_email_sent: bool,
    pub client_email_sent: bool,
    pub client_sms: ClientSmsResult,
    /// Per-recipient detail behind `employee_email_sent`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub employee_deliveries: Vec<RecipientDelivery>,
}

impl DispatchResult {
    /// Soft outcome returned for a missing or non-positive reseller id.
    pub fn empty_reseller() -> Self {
        Self {
            client_sms: ClientSmsResult {
                sent: false,
                message: EMPTY_RESELLER_MESSAGE.to_string(),
            },
            ..Default::default()
        }
    }
}

// ============================================================================
// Lenient payload decoding
// ============================================================================

mod lenient {
    //! Integer casts follow loose scripting-language rules: leading digits
    //! are taken, anything unparseable becomes 0, and null or blank means
    //! "not set".

    use super::{NotificationKind, StatusTransition};
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    fn leading_int(raw: &str) -> i64 {
        let raw = raw.trim_start();
        let (sign, digits) = match raw.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        digits[..end]
            .parse::<i64>()
            .map(|n| sign * n)
            .unwrap_or(0)
    }

    fn cast_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(n.as_i64().unwrap_or_else(|| {
                n.as_f64().map(|f| f as i64).unwrap_or(0)
            })),
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(leading_int(s)),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Array(items) => Some(i64::from(!items.is_empty())),
            Value::Object(entries) => Some(i64::from(!entries.is_empty())),
        }
    }

    /// Whether a value counts as "empty" for presence checks.
    fn is_blank(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty() || s == "0",
            Value::Array(items) => items.is_empty(),
            Value::Object(entries) => entries.is_empty(),
        }
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(cast_i64(&Value::deserialize(d)?))
    }

    pub fn i64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(cast_i64(&Value::deserialize(d)?).unwrap_or(0))
    }

    pub fn notification_kind<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NotificationKind>, D::Error> {
        Ok(cast_i64(&Value::deserialize(d)?).and_then(NotificationKind::from_code))
    }

    pub fn transition<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<StatusTransition>, D::Error> {
        let value = Value::deserialize(d)?;
        if is_blank(&value) {
            return Ok(None);
        }
        let field = |key: &str| value.get(key).and_then(cast_i64);
        Ok(Some(StatusTransition::new(field("from"), field("to"))))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(if b { "1".to_string() } else { String::new() }),
            other => Err(D::Error::custom(format!("expected a string, got {}", other))),
        }
    }
}
