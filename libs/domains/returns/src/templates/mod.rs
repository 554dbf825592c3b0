//! Template data for return notifications.
//!
//! [`TemplateContext`] is the flat set of variables every message is rendered
//! from. It is only handed out once all fields are filled in.

mod engine;

pub use engine::TemplateEngine;

use serde::ser::{Serialize, SerializeMap, Serializer};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::error::{ReturnNotificationError, ReturnResult};
use crate::models::{NotificationKind, NotificationRequest};
use crate::parties::ResolvedParties;

/// Names of the variables available to templates, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateField {
    ComplaintId,
    ComplaintNumber,
    CreatorId,
    CreatorName,
    ExpertId,
    ExpertName,
    ClientId,
    ClientName,
    ConsumptionId,
    ConsumptionNumber,
    AgreementNumber,
    Date,
    Differences,
}

/// A scalar template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Int(i64),
    Text(String),
}

impl TemplateValue {
    /// Zero and the empty string count as "not provided".
    pub fn is_empty(&self) -> bool {
        match self {
            TemplateValue::Int(value) => *value == 0,
            TemplateValue::Text(value) => value.is_empty(),
        }
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        TemplateValue::Int(value)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl Serialize for TemplateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TemplateValue::Int(value) => serializer.serialize_i64(*value),
            TemplateValue::Text(value) => serializer.serialize_str(value),
        }
    }
}

/// Label describing what changed on the return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DifferencesLabel {
    NewPositionAdded,
    PositionStatusHasChanged,
}

impl DifferencesLabel {
    /// New events always get a label; change events only when they carry
    /// transition data.
    pub fn derive(request: &NotificationRequest) -> Option<Self> {
        match request.notification_kind {
            Some(NotificationKind::New) => Some(DifferencesLabel::NewPositionAdded),
            Some(NotificationKind::Change) if request.has_differences() => {
                Some(DifferencesLabel::PositionStatusHasChanged)
            }
            _ => None,
        }
    }
}

/// Ordered variables handed to the renderer and the SMS channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    fields: Vec<(TemplateField, TemplateValue)>,
}

impl TemplateContext {
    /// Assembles every field from the request and the resolved parties, then
    /// checks that none of them is empty.
    pub fn build(
        request: &NotificationRequest,
        parties: &ResolvedParties,
        differences: Option<DifferencesLabel>,
    ) -> ReturnResult<Self> {
        let context = Self::assemble(request, parties, differences);
        context.ensure_complete()?;
        Ok(context)
    }

    /// Assembles every field without checking completeness.
    pub fn assemble(
        request: &NotificationRequest,
        parties: &ResolvedParties,
        differences: Option<DifferencesLabel>,
    ) -> Self {
        let fields = TemplateField::iter()
            .map(|field| {
                let value: TemplateValue = match field {
                    TemplateField::ComplaintId => request.complaint_id.into(),
                    TemplateField::ComplaintNumber => request.complaint_number.as_str().into(),
                    TemplateField::CreatorId => request.creator_id.into(),
                    TemplateField::CreatorName => parties.creator.full_name.as_str().into(),
                    TemplateField::ExpertId => request.expert_id.into(),
                    TemplateField::ExpertName => parties.expert.full_name.as_str().into(),
                    TemplateField::ClientId => request.client_id.into(),
                    TemplateField::ClientName => parties.client.display_name().into(),
                    TemplateField::ConsumptionId => request.consumption_id.into(),
                    TemplateField::ConsumptionNumber => {
                        request.consumption_number.as_str().into()
                    }
                    TemplateField::AgreementNumber => request.agreement_number.as_str().into(),
                    TemplateField::Date => request.date.as_str().into(),
                    TemplateField::Differences => differences
                        .map(|label| label.to_string())
                        .unwrap_or_default()
                        .into(),
                };
                (field, value)
            })
            .collect();

        Self { fields }
    }

    /// First field, in rendering order, whose value is empty.
    pub fn first_empty_field(&self) -> Option<TemplateField> {
        self.fields
            .iter()
            .find(|(_, value)| value.is_empty())
            .map(|(field, _)| *field)
    }

    pub fn ensure_complete(&self) -> ReturnResult<()> {
        match self.first_empty_field() {
            Some(field) => Err(ReturnNotificationError::InvalidState(format!(
                "template field `{}` is empty",
                field
            ))),
            None => Ok(()),
        }
    }

    pub fn get(&self, field: TemplateField) -> Option<&TemplateValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TemplateField, TemplateValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for TemplateContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(&field.to_string(), value)?;
        }
        map.end()
    }
}

/// Message templates, one subject and one body per audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum TemplateKey {
    ComplaintEmployeeEmailSubject,
    ComplaintEmployeeEmailBody,
    ComplaintClientEmailSubject,
    ComplaintClientEmailBody,
}

/// Renders a template for a reseller.
#[cfg_attr(test, mockall::automock)]
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        key: TemplateKey,
        context: &TemplateContext,
        reseller_id: i64,
    ) -> ReturnResult<String>;
}
