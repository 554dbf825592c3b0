//! Return notification service: validates a change event and fans it out to
//! employee email, client email and client SMS.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::channels::{EmailSender, OutgoingEmail, SmsOutcome, SmsRequest, SmsSender};
use crate::config::ReturnNotifierConfig;
use crate::directory::Directory;
use crate::error::{PartyRole, ReturnNotificationError, ReturnResult};
use crate::models::{
    DispatchResult, NotificationEvent, NotificationKind, NotificationRequest, RecipientDelivery,
};
use crate::parties::{Contractor, ResolvedParties};
use crate::recipients::{CallerContext, RecipientResolver};
use crate::templates::{DifferencesLabel, TemplateContext, TemplateKey, TemplateRenderer};

/// Orchestrates one notification dispatch per call.
pub struct ReturnNotificationService<D, R, T, E, S> {
    directory: Arc<D>,
    recipients: Arc<R>,
    templates: Arc<T>,
    email: Arc<E>,
    sms: Arc<S>,
    config: ReturnNotifierConfig,
}

impl<D, R, T, E, S> ReturnNotificationService<D, R, T, E, S>
where
    D: Directory,
    R: RecipientResolver,
    T: TemplateRenderer,
    E: EmailSender,
    S: SmsSender,
{
    pub fn new(
        directory: D,
        recipients: R,
        templates: T,
        email: E,
        sms: S,
        config: ReturnNotifierConfig,
    ) -> Self {
        Self::with_arcs(
            Arc::new(directory),
            Arc::new(recipients),
            Arc::new(templates),
            Arc::new(email),
            Arc::new(sms),
            config,
        )
    }

    /// Create a service from shared collaborators.
    pub fn with_arcs(
        directory: Arc<D>,
        recipients: Arc<R>,
        templates: Arc<T>,
        email: Arc<E>,
        sms: Arc<S>,
        config: ReturnNotifierConfig,
    ) -> Self {
        Self {
            directory,
            recipients,
            templates,
            email,
            sms,
            config,
        }
    }

    pub fn config(&self) -> &ReturnNotifierConfig {
        &self.config
    }

    /// Dispatch notifications for one change event.
    ///
    /// Returns an error only for invalid or unresolvable input and for
    /// recipient authorization failures. Channel failures are reported in the
    /// returned [`DispatchResult`].
    #[instrument(
        skip(self, caller, request),
        fields(reseller_id = ?request.reseller_id, complaint_id = request.complaint_id)
    )]
    pub async fn execute(
        &self,
        caller: &CallerContext,
        request: &NotificationRequest,
    ) -> ReturnResult<DispatchResult> {
        let Some(reseller_id) = request.valid_reseller_id() else {
            debug!("Reseller id missing, nothing to notify");
            return Ok(DispatchResult::empty_reseller());
        };

        let kind = request.notification_kind.ok_or_else(|| {
            ReturnNotificationError::InvalidArgument("notificationKind is required".to_string())
        })?;

        let parties = self.resolve_parties(reseller_id, request).await?;
        let context =
            TemplateContext::build(request, &parties, DifferencesLabel::derive(request))?;

        let sender = self.recipients.sender_address(reseller_id).await?;
        let employees = self
            .recipients
            .authorized_recipients(caller, reseller_id, &self.config.permission_tag)
            .await?;

        let mut result = DispatchResult {
            employee_deliveries: self
                .notify_employees(&sender, &employees, &context, reseller_id)
                .await,
            ..Default::default()
        };
        result.employee_email_sent = result.employee_deliveries.iter().any(|d| d.sent);

        match request.target_status() {
            Some(to_status) if kind == NotificationKind::Change => {
                let (client_email_sent, sms_outcome) = tokio::join!(
                    self.notify_client_by_email(&sender, &parties.client, &context, reseller_id),
                    self.notify_client_by_sms(&parties.client, kind, to_status, &context, reseller_id),
                );

                result.client_email_sent = client_email_sent;
                if let Some(outcome) = sms_outcome {
                    result.client_sms.sent = outcome.sent;
                    if let Some(error) = outcome.error.filter(|e| !e.is_empty()) {
                        result.client_sms.message = error;
                    }
                }
            }
            _ => debug!(kind = ?kind, "No status change, client channels skipped"),
        }

        info!(
            employee_email_sent = result.employee_email_sent,
            employee_recipients = result.employee_deliveries.len(),
            client_email_sent = result.client_email_sent,
            client_sms_sent = result.client_sms.sent,
            "Return notification dispatched"
        );

        Ok(result)
    }

    async fn resolve_parties(
        &self,
        reseller_id: i64,
        request: &NotificationRequest,
    ) -> ReturnResult<ResolvedParties> {
        let reseller = self
            .directory
            .resolve_reseller(reseller_id)
            .await?
            .ok_or(ReturnNotificationError::NotFound(PartyRole::Reseller))?;

        let client = self
            .directory
            .resolve_client(request.client_id)
            .await?
            .filter(|client| client.is_customer_of(reseller_id))
            .ok_or(ReturnNotificationError::NotFound(PartyRole::Client))?;

        let creator = self
            .directory
            .resolve_employee(request.creator_id)
            .await?
            .ok_or(ReturnNotificationError::NotFound(PartyRole::Creator))?;

        let expert = self
            .directory
            .resolve_employee(request.expert_id)
            .await?
            .ok_or(ReturnNotificationError::NotFound(PartyRole::Expert))?;

        Ok(ResolvedParties {
            reseller,
            client,
            creator,
            expert,
        })
    }

    fn render_message(
        &self,
        subject: TemplateKey,
        body: TemplateKey,
        context: &TemplateContext,
        reseller_id: i64,
    ) -> ReturnResult<(String, String)> {
        Ok((
            self.templates.render(subject, context, reseller_id)?,
            self.templates.render(body, context, reseller_id)?,
        ))
    }

    async fn notify_employees(
        &self,
        sender: &str,
        recipients: &[String],
        context: &TemplateContext,
        reseller_id: i64,
    ) -> Vec<RecipientDelivery> {
        if sender.is_empty() || recipients.is_empty() {
            debug!(
                has_sender = !sender.is_empty(),
                recipients = recipients.len(),
                "Employee email skipped"
            );
            return Vec::new();
        }

        let (subject, body) = match self.render_message(
            TemplateKey::ComplaintEmployeeEmailSubject,
            TemplateKey::ComplaintEmployeeEmailBody,
            context,
            reseller_id,
        ) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Employee email could not be rendered");
                return recipients
                    .iter()
                    .map(|recipient| RecipientDelivery {
                        recipient: recipient.clone(),
                        sent: false,
                        error: Some(e.to_string()),
                    })
                    .collect();
            }
        };

        stream::iter(recipients)
            .map(|recipient| {
                let email = OutgoingEmail {
                    from: sender.to_string(),
                    to: recipient.clone(),
                    subject: subject.clone(),
                    body: body.clone(),
                };
                async move {
                    match self.email.send(&email).await {
                        Ok(sent) => {
                            debug!(to = %email.to, message_id = ?sent.message_id, "Employee email sent");
                            RecipientDelivery {
                                recipient: email.to,
                                sent: true,
                                error: None,
                            }
                        }
                        Err(e) => {
                            warn!(
                                to = %email.to,
                                transport = self.email.name(),
                                error = %e,
                                "Employee email failed"
                            );
                            RecipientDelivery {
                                recipient: email.to,
                                sent: false,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
            })
            .buffered(self.config.max_concurrent_sends.max(1))
            .collect()
            .await
    }

    async fn notify_client_by_email(
        &self,
        sender: &str,
        client: &Contractor,
        context: &TemplateContext,
        reseller_id: i64,
    ) -> bool {
        let Some(address) = client.email_address().filter(|_| !sender.is_empty()) else {
            debug!(client_id = client.id, "Client email skipped");
            return false;
        };

        let (subject, body) = match self.render_message(
            TemplateKey::ComplaintClientEmailSubject,
            TemplateKey::ComplaintClientEmailBody,
            context,
            reseller_id,
        ) {
            Ok(message) => message,
            Err(e) => {
                warn!(client_id = client.id, error = %e, "Client email could not be rendered");
                return false;
            }
        };

        let email = OutgoingEmail {
            from: sender.to_string(),
            to: address.to_string(),
            subject,
            body,
        };

        match self.email.send(&email).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    client_id = client.id,
                    transport = self.email.name(),
                    error = %e,
                    "Client email failed"
                );
                false
            }
        }
    }

    async fn notify_client_by_sms(
        &self,
        client: &Contractor,
        kind: NotificationKind,
        to_status: i64,
        context: &TemplateContext,
        reseller_id: i64,
    ) -> Option<SmsOutcome> {
        if client.mobile_number().is_none() {
            debug!(client_id = client.id, "Client has no mobile number, SMS skipped");
            return None;
        }

        let request = SmsRequest {
            reseller_id,
            client_id: client.id,
            event: NotificationEvent::for_kind(kind),
            to_status,
            context: context.clone(),
        };

        let outcome = self.sms.send(&request).await;
        if let Some(error) = &outcome.error {
            warn!(
                client_id = client.id,
                transport = self.sms.name(),
                sent = outcome.sent,
                error = %error,
                "SMS channel reported an error"
            );
        }
        Some(outcome)
    }
}

impl<D, R, T, E, S> Clone for ReturnNotificationService<D, R, T, E, S> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            recipients: Arc::clone(&self.recipients),
            templates: Arc::clone(&self.templates),
            email: Arc::clone(&self.email),
            sms: Arc::clone(&self.sms),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MockEmailSender, MockSmsSender, SentEmail};
    use crate::directory::MockDirectory;
    use crate::models::{EMPTY_RESELLER_MESSAGE, StatusTransition};
    use crate::recipients::MockRecipientResolver;
    use crate::templates::MockTemplateRenderer;
    use crate::templates::fixtures::{parties, request};

    const CLIENT_EMAIL: &str = "client@acme.test";

    type TestService = ReturnNotificationService<
        MockDirectory,
        MockRecipientResolver,
        MockTemplateRenderer,
        MockEmailSender,
        MockSmsSender,
    >;

    struct Mocks {
        directory: MockDirectory,
        recipients: MockRecipientResolver,
        templates: MockTemplateRenderer,
        email: MockEmailSender,
        sms: MockSmsSender,
        config: ReturnNotifierConfig,
    }

    impl Mocks {
        fn new() -> Self {
            let mut email = MockEmailSender::new();
            email.expect_name().return_const("mock");
            let mut sms = MockSmsSender::new();
            sms.expect_name().return_const("mock");

            Self {
                directory: MockDirectory::new(),
                recipients: MockRecipientResolver::new(),
                templates: MockTemplateRenderer::new(),
                email,
                sms,
                config: ReturnNotifierConfig::default(),
            }
        }

        /// Directory knows the fixture parties; `client` replaces the client.
        fn with_directory(mut self, client: Option<Contractor>) -> Self {
            let fixture = parties();
            let client = client.unwrap_or(fixture.client);
            self.directory
                .expect_resolve_reseller()
                .returning(|id| Ok(Some(Contractor::seller(id, "Reseller"))));
            self.directory
                .expect_resolve_client()
                .returning(move |_| Ok(Some(client.clone())));
            self.directory
                .expect_resolve_employee()
                .returning(move |id| {
                    let fixture = parties();
                    Ok([fixture.creator, fixture.expert]
                        .into_iter()
                        .find(|employee| employee.id == id))
                });
            self
        }

        fn with_recipients(mut self, sender: &str, employees: &[&str]) -> Self {
            let sender = sender.to_string();
            let employees: Vec<String> = employees.iter().map(|e| e.to_string()).collect();
            self.recipients
                .expect_sender_address()
                .returning(move |_| Ok(sender.clone()));
            self.recipients
                .expect_authorized_recipients()
                .withf(|caller, reseller_id, permission| {
                    caller.reseller_id == *reseller_id && permission == "tsGoodsReturn"
                })
                .returning(move |_, _, _| Ok(employees.clone()));
            self
        }

        fn with_templates(mut self) -> Self {
            self.templates
                .expect_render()
                .returning(|key, _, _| Ok(key.to_string()));
            self
        }

        fn expect_employee_emails(mut self, times: usize) -> Self {
            self.email
                .expect_send()
                .withf(|email| email.to != CLIENT_EMAIL)
                .times(times)
                .returning(|_| Ok(SentEmail::default()));
            self
        }

        fn expect_client_email(mut self, times: usize) -> Self {
            self.email
                .expect_send()
                .withf(|email| email.to == CLIENT_EMAIL)
                .times(times)
                .returning(|_| Ok(SentEmail::default()));
            self
        }

        fn expect_sms(mut self, times: usize, outcome: SmsOutcome) -> Self {
            self.sms
                .expect_send()
                .times(times)
                .returning(move |_| outcome.clone());
            self
        }

        fn service(self) -> TestService {
            ReturnNotificationService::new(
                self.directory,
                self.recipients,
                self.templates,
                self.email,
                self.sms,
                self.config,
            )
        }
    }

    fn caller() -> CallerContext {
        CallerContext::new(10)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_missing_reseller_is_soft_result() {
        let service = Mocks::new().service();

        for reseller_id in [None, Some(0), Some(-5)] {
            let mut request = request(NotificationKind::Change);
            request.reseller_id = reseller_id;

            let result = service.execute(&caller(), &request).await.unwrap();

            assert!(!result.employee_email_sent);
            assert!(!result.client_email_sent);
            assert!(!result.client_sms.sent);
            assert_eq!(result.client_sms.message, EMPTY_RESELLER_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_missing_kind_is_invalid_argument() {
        let service = Mocks::new().service();
        let mut request = request(NotificationKind::New);
        request.notification_kind = None;

        let err = service.execute(&caller(), &request).await.unwrap_err();

        match err {
            ReturnNotificationError::InvalidArgument(message) => {
                assert_eq!(message, "notificationKind is required")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_reseller_is_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .directory
            .expect_resolve_reseller()
            .returning(|_| Ok(None));
        let service = mocks.service();

        let err = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReturnNotificationError::NotFound(PartyRole::Reseller)
        ));
    }

    #[tokio::test]
    async fn test_client_of_other_reseller_is_not_found() {
        for kind in [NotificationKind::New, NotificationKind::Change] {
            let service = Mocks::new()
                .with_directory(Some(Contractor::customer(5, 99, "Foreign client")))
                .service();

            let err = service.execute(&caller(), &request(kind)).await.unwrap_err();

            assert!(matches!(
                err,
                ReturnNotificationError::NotFound(PartyRole::Client)
            ));
        }
    }

    #[tokio::test]
    async fn test_non_customer_client_is_not_found() {
        let mut not_a_customer = Contractor::employee(5, "Staff");
        not_a_customer.seller_id = Some(10);
        let service = Mocks::new().with_directory(Some(not_a_customer)).service();

        let err = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReturnNotificationError::NotFound(PartyRole::Client)
        ));
    }

    #[tokio::test]
    async fn test_missing_client_is_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .directory
            .expect_resolve_reseller()
            .returning(|id| Ok(Some(Contractor::seller(id, "Reseller"))));
        mocks.directory.expect_resolve_client().returning(|_| Ok(None));
        let service = mocks.service();

        let err = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReturnNotificationError::NotFound(PartyRole::Client)
        ));
    }

    #[tokio::test]
    async fn test_missing_creator_and_expert_are_not_found() {
        let service = Mocks::new().with_directory(None).service();

        let mut request = request(NotificationKind::New);
        request.creator_id = 404;
        let err = service.execute(&caller(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            ReturnNotificationError::NotFound(PartyRole::Creator)
        ));

        request.creator_id = 7;
        request.expert_id = 404;
        let err = service.execute(&caller(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            ReturnNotificationError::NotFound(PartyRole::Expert)
        ));
    }

    #[tokio::test]
    async fn test_empty_template_field_stops_before_dispatch() {
        let service = Mocks::new().with_directory(None).service();
        let mut request = request(NotificationKind::New);
        request.agreement_number.clear();

        let err = service.execute(&caller(), &request).await.unwrap_err();

        match err {
            ReturnNotificationError::InvalidState(message) => {
                assert!(message.contains("AGREEMENT_NUMBER"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_change_without_differences_is_invalid_state() {
        let service = Mocks::new().with_directory(None).service();
        let mut request = request(NotificationKind::Change);
        request.status_transition = None;

        let err = service.execute(&caller(), &request).await.unwrap_err();

        match err {
            ReturnNotificationError::InvalidState(message) => {
                assert!(message.contains("DIFFERENCES"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_recipient_lookup_propagates() {
        let mut mocks = Mocks::new().with_directory(None);
        mocks
            .recipients
            .expect_sender_address()
            .returning(|_| Ok("returns@shop.test".to_string()));
        mocks
            .recipients
            .expect_authorized_recipients()
            .returning(|caller, reseller_id, _| caller.authorize(reseller_id).map(|_| Vec::new()));
        let service = mocks.service();

        let err = service
            .execute(&CallerContext::new(77), &request(NotificationKind::New))
            .await
            .unwrap_err();

        assert!(matches!(err, ReturnNotificationError::Unauthorized(_)));
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_new_event_notifies_employees_only() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(1)
            .expect_client_email(0)
            .expect_sms(0, SmsOutcome::delivered())
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert!(!result.client_email_sent);
        assert!(!result.client_sms.sent);
        assert_eq!(result.client_sms.message, "");
    }

    #[tokio::test]
    async fn test_status_change_notifies_all_channels() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(1)
            .expect_client_email(1);
        mocks
            .sms
            .expect_send()
            .withf(|sms| {
                sms.reseller_id == 10
                    && sms.client_id == 5
                    && sms.to_status == 2
                    && sms.event == NotificationEvent::ChangeReturnStatus
                    && sms.context.first_empty_field().is_none()
            })
            .times(1)
            .returning(|_| SmsOutcome::delivered());
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert!(result.client_email_sent);
        assert!(result.client_sms.sent);
        assert_eq!(result.client_sms.message, "");
    }

    #[tokio::test]
    async fn test_change_without_target_status_skips_client() {
        for transition in [
            StatusTransition::new(Some(1), None),
            StatusTransition::new(Some(1), Some(0)),
        ] {
            let service = Mocks::new()
                .with_directory(None)
                .with_recipients("returns@shop.test", &["agent@shop.test"])
                .with_templates()
                .expect_employee_emails(1)
                .expect_client_email(0)
                .expect_sms(0, SmsOutcome::delivered())
                .service();
            let mut request = request(NotificationKind::Change);
            request.status_transition = Some(transition);

            let result = service.execute(&caller(), &request).await.unwrap();

            assert!(result.employee_email_sent);
            assert!(!result.client_email_sent);
            assert!(!result.client_sms.sent);
        }
    }

    #[tokio::test]
    async fn test_no_employee_recipients() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &[])
            .with_templates()
            .expect_employee_emails(0)
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap();

        assert!(!result.employee_email_sent);
        assert!(result.employee_deliveries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_sender_skips_all_email_but_not_sms() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(0)
            .expect_client_email(0)
            .expect_sms(1, SmsOutcome::delivered())
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(!result.employee_email_sent);
        assert!(!result.client_email_sent);
        assert!(result.client_sms.sent);
    }

    #[tokio::test]
    async fn test_one_failing_recipient_does_not_block_others() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients(
                "returns@shop.test",
                &["broken@shop.test", "agent@shop.test"],
            )
            .with_templates()
            .expect_client_email(1)
            .expect_sms(1, SmsOutcome::delivered());
        mocks
            .email
            .expect_send()
            .withf(|email| email.to == "broken@shop.test")
            .times(1)
            .returning(|_| Err(ReturnNotificationError::Provider("mailbox full".to_string())));
        mocks
            .email
            .expect_send()
            .withf(|email| email.to == "agent@shop.test")
            .times(1)
            .returning(|_| Ok(SentEmail::default()));
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert!(result.client_email_sent);
        assert!(result.client_sms.sent);
        assert_eq!(result.employee_deliveries.len(), 2);
        assert_eq!(result.employee_deliveries[0].recipient, "broken@shop.test");
        assert!(!result.employee_deliveries[0].sent);
        assert!(
            result.employee_deliveries[0]
                .error
                .as_deref()
                .unwrap()
                .contains("mailbox full")
        );
        assert!(result.employee_deliveries[1].sent);
    }

    #[tokio::test]
    async fn test_all_employee_sends_failing() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["a@shop.test", "b@shop.test"])
            .with_templates();
        mocks
            .email
            .expect_send()
            .times(2)
            .returning(|_| Err(ReturnNotificationError::Provider("down".to_string())));
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap();

        assert!(!result.employee_email_sent);
        assert!(result.employee_deliveries.iter().all(|d| !d.sent));
    }

    #[tokio::test]
    async fn test_client_email_failure_is_absorbed() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(1)
            .expect_sms(1, SmsOutcome::delivered());
        mocks
            .email
            .expect_send()
            .withf(|email| email.to == CLIENT_EMAIL)
            .times(1)
            .returning(|_| Err(ReturnNotificationError::Provider("rejected".to_string())));
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert!(!result.client_email_sent);
        assert!(result.client_sms.sent);
    }

    #[tokio::test]
    async fn test_sms_error_is_reported_even_when_sent() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &[])
            .with_templates()
            .expect_client_email(1)
            .expect_sms(
                1,
                SmsOutcome {
                    sent: true,
                    error: Some("delivered with delay".to_string()),
                },
            )
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(result.client_sms.sent);
        assert_eq!(result.client_sms.message, "delivered with delay");
    }

    #[tokio::test]
    async fn test_sms_failure_is_reported() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &[])
            .with_templates()
            .expect_client_email(1)
            .expect_sms(1, SmsOutcome::failed("unknown number"))
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(!result.client_sms.sent);
        assert_eq!(result.client_sms.message, "unknown number");
        assert!(result.client_email_sent);
    }

    #[tokio::test]
    async fn test_client_without_contacts_is_skipped() {
        let service = Mocks::new()
            .with_directory(Some(Contractor::customer(5, 10, "ACME")))
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(1)
            .expect_client_email(0)
            .expect_sms(0, SmsOutcome::delivered())
            .service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert!(!result.client_email_sent);
        assert!(!result.client_sms.sent);
    }

    #[tokio::test]
    async fn test_render_failure_is_absorbed() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .expect_employee_emails(0)
            .expect_client_email(1)
            .expect_sms(1, SmsOutcome::delivered());
        mocks
            .templates
            .expect_render()
            .returning(|key, _, _| match key {
                TemplateKey::ComplaintEmployeeEmailBody => {
                    Err(ReturnNotificationError::Template("broken".to_string()))
                }
                other => Ok(other.to_string()),
            });
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::Change))
            .await
            .unwrap();

        assert!(!result.employee_email_sent);
        assert_eq!(result.employee_deliveries.len(), 1);
        assert!(result.client_email_sent);
        assert!(result.client_sms.sent);
    }

    #[tokio::test]
    async fn test_employee_message_is_rendered_once() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients(
                "returns@shop.test",
                &["a@shop.test", "b@shop.test", "c@shop.test"],
            )
            .expect_employee_emails(3);
        mocks
            .templates
            .expect_render()
            .withf(|key, _, reseller_id| {
                *reseller_id == 10
                    && matches!(
                        key,
                        TemplateKey::ComplaintEmployeeEmailSubject
                            | TemplateKey::ComplaintEmployeeEmailBody
                    )
            })
            .times(2)
            .returning(|key, _, _| Ok(key.to_string()));
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap();

        assert!(result.employee_email_sent);
        assert_eq!(result.employee_deliveries.len(), 3);
    }

    #[tokio::test]
    async fn test_repeated_calls_dispatch_again() {
        let service = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(2)
            .expect_client_email(2)
            .expect_sms(2, SmsOutcome::delivered())
            .service();
        let request = request(NotificationKind::Change);

        let first = service.execute(&caller(), &request).await.unwrap();
        let second = service.execute(&caller(), &request).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sequential_sends_keep_recipient_order() {
        let mut mocks = Mocks::new()
            .with_directory(None)
            .with_recipients(
                "returns@shop.test",
                &["1@shop.test", "2@shop.test", "3@shop.test"],
            )
            .with_templates()
            .expect_employee_emails(3);
        mocks.config = ReturnNotifierConfig::default().with_max_concurrent_sends(1);
        let service = mocks.service();

        let result = service
            .execute(&caller(), &request(NotificationKind::New))
            .await
            .unwrap();

        let order: Vec<&str> = result
            .employee_deliveries
            .iter()
            .map(|d| d.recipient.as_str())
            .collect();
        assert_eq!(order, vec!["1@shop.test", "2@shop.test", "3@shop.test"]);
    }

    #[tokio::test]
    async fn test_shared_collaborators_across_clones() {
        let mocks = Mocks::new()
            .with_directory(None)
            .with_recipients("returns@shop.test", &["agent@shop.test"])
            .with_templates()
            .expect_employee_emails(2);
        let email = Arc::new(mocks.email);
        let service = ReturnNotificationService::with_arcs(
            Arc::new(mocks.directory),
            Arc::new(mocks.recipients),
            Arc::new(mocks.templates),
            Arc::clone(&email),
            Arc::new(mocks.sms),
            ReturnNotifierConfig::default().with_max_concurrent_sends(3),
        );
        let cloned = service.clone();

        assert_eq!(cloned.config().max_concurrent_sends, 3);
        assert_eq!(cloned.config().permission_tag, "tsGoodsReturn");
        assert_eq!(Arc::strong_count(&email), 3);

        let request = request(NotificationKind::New);
        assert!(service.execute(&caller(), &request).await.unwrap().employee_email_sent);
        assert!(cloned.execute(&caller(), &request).await.unwrap().employee_email_sent);
    }
}
