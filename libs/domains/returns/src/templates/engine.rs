//! Handlebars-based template rendering with per-reseller overrides.

use std::sync::Arc;

use handlebars::{Handlebars, no_escape};
use strum::IntoEnumIterator;
use tracing::debug;

use super::{TemplateContext, TemplateKey, TemplateRenderer};
use crate::error::ReturnResult;

const EMPLOYEE_SUBJECT_TEMPLATE: &str =
    "Return {{COMPLAINT_NUMBER}}: {{DIFFERENCES}}";

const EMPLOYEE_BODY_TEMPLATE: &str = r#"Return {{COMPLAINT_NUMBER}} (id {{COMPLAINT_ID}}) was updated: {{DIFFERENCES}}.

Client: {{CLIENT_NAME}} (id {{CLIENT_ID}})
Created by: {{CREATOR_NAME}} (id {{CREATOR_ID}})
Expert: {{EXPERT_NAME}} (id {{EXPERT_ID}})
Consumption: {{CONSUMPTION_NUMBER}} (id {{CONSUMPTION_ID}})
Agreement: {{AGREEMENT_NUMBER}}
Date: {{DATE}}
"#;

const CLIENT_SUBJECT_TEMPLATE: &str = "Your return {{COMPLAINT_NUMBER}} has a new status";

const CLIENT_BODY_TEMPLATE: &str = r#"Dear {{CLIENT_NAME}},

the status of your return {{COMPLAINT_NUMBER}} under agreement {{AGREEMENT_NUMBER}} has changed ({{DIFFERENCES}}).

Date: {{DATE}}
Your contact: {{EXPERT_NAME}}
"#;

/// Template engine for rendering return notification messages.
///
/// Every [`TemplateKey`] has a built-in template. A reseller may register its
/// own version of any key, which then takes precedence for that reseller.
#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in templates registered.
    pub fn new() -> ReturnResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(no_escape);

        for key in TemplateKey::iter() {
            handlebars.register_template_string(&key.to_string(), Self::default_source(key))?;
        }

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    /// Registers `source` as the template for `key` when rendering for
    /// `reseller_id`.
    pub fn with_reseller_template(
        mut self,
        reseller_id: i64,
        key: TemplateKey,
        source: &str,
    ) -> ReturnResult<Self> {
        Arc::make_mut(&mut self.handlebars)
            .register_template_string(&Self::override_name(reseller_id, key), source)?;
        Ok(self)
    }

    fn default_source(key: TemplateKey) -> &'static str {
        match key {
            TemplateKey::ComplaintEmployeeEmailSubject => EMPLOYEE_SUBJECT_TEMPLATE,
            TemplateKey::ComplaintEmployeeEmailBody => EMPLOYEE_BODY_TEMPLATE,
            TemplateKey::ComplaintClientEmailSubject => CLIENT_SUBJECT_TEMPLATE,
            TemplateKey::ComplaintClientEmailBody => CLIENT_BODY_TEMPLATE,
        }
    }

    fn override_name(reseller_id: i64, key: TemplateKey) -> String {
        format!("{}:{}", reseller_id, key)
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(
        &self,
        key: TemplateKey,
        context: &TemplateContext,
        reseller_id: i64,
    ) -> ReturnResult<String> {
        let reseller_template = Self::override_name(reseller_id, key);
        let name = if self.handlebars.has_template(&reseller_template) {
            reseller_template
        } else {
            key.to_string()
        };

        debug!(template = %name, reseller_id, "Rendering return notification template");

        Ok(self.handlebars.render(&name, context)?)
    }
}
