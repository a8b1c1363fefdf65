//! HandleBillingWebhookHandler - Command handler for provider webhook events.
//!
//! Translates verified billing events into account updates and notification
//! records. Events are not deduplicated and writes are last-write-wins, so two
//! events for the same account processed concurrently may interleave.

use std::sync::Arc;

use crate::domain::billing::{
    Account, BillingError, Notification, PaymentMethodSummary, PlanCatalog, SubscriptionChange,
    SubscriptionPlan,
};
use crate::domain::foundation::{AccountId, Timestamp};
use crate::ports::{
    AccountRepository, NotificationRepository, PaymentErrorCode, PaymentProvider, WebhookEvent,
    WebhookEventData, WebhookEventType,
};

use super::account_resolver::{AccountHint, AccountResolver};

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// What the delivery changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleBillingWebhookResult {
    /// Subscription created or updated; plan and quota applied.
    SubscriptionApplied {
        account_id: AccountId,
        plan: SubscriptionPlan,
    },
    /// Subscription deleted; account returned to the default plan.
    SubscriptionCanceled { account_id: AccountId },
    /// Cached payment method summary refreshed.
    PaymentMethodUpdated { account_id: AccountId },
    /// Invoice outcome recorded as a notification.
    InvoiceRecorded { account_id: AccountId, paid: bool },
    /// Event type we do not act on.
    Ignored { event_type: String },
}

/// Handler for provider webhook events.
pub struct HandleBillingWebhookHandler {
    accounts: Arc<dyn AccountRepository>,
    notifications: Arc<dyn NotificationRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
    resolver: AccountResolver,
    catalog: Arc<PlanCatalog>,
}

impl HandleBillingWebhookHandler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        notifications: Arc<dyn NotificationRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        let resolver = AccountResolver::new(accounts.clone(), payment_provider.clone());
        Self {
            accounts,
            notifications,
            payment_provider,
            resolver,
            catalog,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<HandleBillingWebhookResult, BillingError> {
        // 1. Verify signature and parse event
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| match e.code {
                PaymentErrorCode::MalformedWebhook => {
                    tracing::warn!(error = %e, "Signed webhook payload could not be parsed");
                    BillingError::validation("payload", e.message)
                }
                _ => {
                    tracing::warn!(error = %e, "Webhook verification failed");
                    BillingError::invalid_webhook_signature()
                }
            })?;

        tracing::info!(
            event_id = %event.id,
            event_type = event.event_type.as_str(),
            livemode = event.livemode,
            "Billing webhook received"
        );

        // 2. Dispatch by type
        match &event.event_type {
            WebhookEventType::SubscriptionCreated | WebhookEventType::SubscriptionUpdated => {
                self.handle_subscription_changed(&event).await
            }
            WebhookEventType::SubscriptionDeleted => {
                self.handle_subscription_deleted(&event).await
            }
            WebhookEventType::PaymentMethodAttached | WebhookEventType::PaymentMethodUpdated => {
                self.handle_payment_method(&event).await
            }
            WebhookEventType::InvoicePaymentSucceeded => self.handle_invoice(&event, true).await,
            WebhookEventType::InvoicePaymentFailed => self.handle_invoice(&event, false).await,
            WebhookEventType::Unknown(event_type) => {
                tracing::debug!(event_id = %event.id, event_type = %event_type, "Ignoring webhook event");
                Ok(HandleBillingWebhookResult::Ignored {
                    event_type: event_type.clone(),
                })
            }
        }
    }

    async fn handle_subscription_changed(
        &self,
        event: &WebhookEvent,
    ) -> Result<HandleBillingWebhookResult, BillingError> {
        let WebhookEventData::Subscription {
            subscription_id,
            customer_id,
            status,
            price_id,
            amount,
            current_period_end,
            account_id,
            ..
        } = &event.data
        else {
            return Err(unexpected_data(event));
        };

        let plan = self.plan_for(price_id.as_deref(), &event.id);

        let account = self
            .resolver
            .resolve(&AccountHint {
                account_id: account_id.clone(),
                customer_id: Some(customer_id.clone()),
                email: None,
            })
            .await?;

        let change = SubscriptionChange::active(
            plan,
            status.clone(),
            price_id.clone(),
            subscription_id.clone(),
            current_period_end.and_then(Timestamp::from_unix_secs),
            *amount,
        );
        self.accounts
            .apply_subscription_change(&account.id, &change)
            .await?;
        self.notify(Notification::subscription_updated(account.id.clone(), plan))
            .await?;

        tracing::info!(
            event_id = %event.id,
            account_id = %account.id,
            customer_id = %customer_id,
            plan = plan.display_name(),
            max_leads = change.max_leads,
            "Subscription applied"
        );

        Ok(HandleBillingWebhookResult::SubscriptionApplied {
            account_id: account.id,
            plan,
        })
    }

    async fn handle_subscription_deleted(
        &self,
        event: &WebhookEvent,
    ) -> Result<HandleBillingWebhookResult, BillingError> {
        let WebhookEventData::Subscription {
            customer_id,
            account_id,
            ..
        } = &event.data
        else {
            return Err(unexpected_data(event));
        };

        let account = self
            .resolver
            .resolve(&AccountHint {
                account_id: account_id.clone(),
                customer_id: Some(customer_id.clone()),
                email: None,
            })
            .await?;

        let change = SubscriptionChange::canceled(&self.catalog);
        self.accounts
            .apply_subscription_change(&account.id, &change)
            .await?;
        self.notify(Notification::subscription_canceled(
            account.id.clone(),
            change.plan,
        ))
        .await?;

        tracing::info!(
            event_id = %event.id,
            account_id = %account.id,
            customer_id = %customer_id,
            "Subscription canceled"
        );

        Ok(HandleBillingWebhookResult::SubscriptionCanceled {
            account_id: account.id,
        })
    }

    async fn handle_payment_method(
        &self,
        event: &WebhookEvent,
    ) -> Result<HandleBillingWebhookResult, BillingError> {
        let WebhookEventData::PaymentMethod {
            payment_method_id,
            customer_id,
            method_type,
            card,
            account_id,
        } = &event.data
        else {
            return Err(unexpected_data(event));
        };

        let account = self
            .resolver
            .resolve(&AccountHint {
                account_id: account_id.clone(),
                customer_id: customer_id.clone(),
                email: None,
            })
            .await?;

        let summary = PaymentMethodSummary {
            method_type: method_type.clone(),
            last4: card.as_ref().map(|c| c.last4.clone()),
            brand: card.as_ref().map(|c| c.brand.clone()),
            exp_month: card.as_ref().map(|c| c.exp_month),
            exp_year: card.as_ref().map(|c| c.exp_year),
        };
        self.accounts
            .set_payment_method(&account.id, &summary)
            .await?;

        tracing::info!(
            event_id = %event.id,
            account_id = %account.id,
            payment_method_id = %payment_method_id,
            "Payment method summary updated"
        );

        Ok(HandleBillingWebhookResult::PaymentMethodUpdated {
            account_id: account.id,
        })
    }

    async fn handle_invoice(
        &self,
        event: &WebhookEvent,
        paid: bool,
    ) -> Result<HandleBillingWebhookResult, BillingError> {
        let WebhookEventData::Invoice {
            invoice_id,
            customer_id,
            customer_email,
            amount_paid,
            amount_due,
            currency,
            account_id,
            ..
        } = &event.data
        else {
            return Err(unexpected_data(event));
        };

        let account: Account = self
            .resolver
            .resolve(&AccountHint {
                account_id: account_id.clone(),
                customer_id: Some(customer_id.clone()),
                email: customer_email.clone(),
            })
            .await?;

        let notification = if paid {
            Notification::payment_succeeded(account.id.clone(), *amount_paid, currency)
        } else {
            Notification::payment_failed(account.id.clone(), *amount_due, currency)
        };
        self.notify(notification).await?;

        if paid {
            tracing::info!(event_id = %event.id, account_id = %account.id, invoice_id = %invoice_id, "Invoice paid");
        } else {
            tracing::warn!(event_id = %event.id, account_id = %account.id, invoice_id = %invoice_id, "Invoice payment failed");
        }

        Ok(HandleBillingWebhookResult::InvoiceRecorded {
            account_id: account.id,
            paid,
        })
    }

    /// Unknown prices fall back to the default plan.
    fn plan_for(&self, price_id: Option<&str>, event_id: &str) -> SubscriptionPlan {
        match price_id.and_then(|p| self.catalog.plan_for_price(p)) {
            Some(plan) => plan,
            None => {
                tracing::warn!(
                    event_id = %event_id,
                    price_id = price_id.unwrap_or("<none>"),
                    "Price not in plan catalog, using default plan"
                );
                self.catalog.default_plan()
            }
        }
    }

    async fn notify(&self, notification: Notification) -> Result<(), BillingError> {
        self.notifications.append(&notification).await?;
        Ok(())
    }
}

fn unexpected_data(event: &WebhookEvent) -> BillingError {
    BillingError::infrastructure(format!(
        "Unexpected webhook data for {} event {}",
        event.event_type.as_str(),
        event.id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryAccountRepository, InMemoryNotificationRepository};
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::billing::{NotificationKind, CANCELED_STATUS};
    use crate::ports::{CardDetails, Customer, PaymentError};

    // ════════════════════════════════════════════════════════════════════════════
    // Test Fixture
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        handler: HandleBillingWebhookHandler,
        accounts: Arc<InMemoryAccountRepository>,
        notifications: Arc<InMemoryNotificationRepository>,
        provider: MockPaymentProvider,
    }

    fn catalog() -> Arc<PlanCatalog> {
        Arc::new(
            PlanCatalog::new()
                .with_price("price_basic", SubscriptionPlan::Basic)
                .with_price("price_pro", SubscriptionPlan::Pro)
                .with_price("price_ent", SubscriptionPlan::Enterprise),
        )
    }

    fn account_id() -> AccountId {
        AccountId::new("uid-1").unwrap()
    }

    fn fixture() -> Fixture {
        let account = Account::new(
            account_id(),
            Some("dana@example.com".to_string()),
            &catalog(),
        );
        let accounts = Arc::new(InMemoryAccountRepository::with_accounts([account]));
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let provider = MockPaymentProvider::new();
        let handler = HandleBillingWebhookHandler::new(
            accounts.clone(),
            notifications.clone(),
            Arc::new(provider.clone()),
            catalog(),
        );
        Fixture {
            handler,
            accounts,
            notifications,
            provider,
        }
    }

    fn cmd() -> HandleBillingWebhookCommand {
        HandleBillingWebhookCommand {
            payload: b"{}".to_vec(),
            signature: "t=1,v1=abc".to_string(),
        }
    }

    async fn stored(f: &Fixture) -> Account {
        f.accounts.find_by_id(&account_id()).await.unwrap().unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription Events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_created_sets_plan_quota_and_notifies_once() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionCreated,
            "cus_1",
            "price_pro",
            Some("uid-1"),
        ));

        let result = f.handler.handle(cmd()).await.unwrap();

        assert_eq!(
            result,
            HandleBillingWebhookResult::SubscriptionApplied {
                account_id: account_id(),
                plan: SubscriptionPlan::Pro,
            }
        );
        let account = stored(&f).await;
        assert_eq!(account.subscription, SubscriptionPlan::Pro);
        assert_eq!(account.max_leads, 100);
        assert_eq!(account.billing.status.as_deref(), Some("active"));
        assert_eq!(account.billing.stripe_price_id.as_deref(), Some("price_pro"));
        assert_eq!(account.billing.stripe_subscription_id.as_deref(), Some("sub_mock"));
        assert_eq!(account.billing.amount, Some(4900));
        assert!(account.billing.next_billing_date.is_some());

        let notifications = f.notifications.all().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Subscription);
    }

    #[tokio::test]
    async fn subscription_with_unknown_price_uses_default_plan() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionUpdated,
            "cus_1",
            "price_legacy",
            Some("uid-1"),
        ));

        f.handler.handle(cmd()).await.unwrap();

        let account = stored(&f).await;
        assert_eq!(account.subscription, SubscriptionPlan::Basic);
        assert_eq!(account.max_leads, 25);
    }

    #[tokio::test]
    async fn subscription_deleted_resets_to_default() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionCreated,
            "cus_1",
            "price_ent",
            Some("uid-1"),
        ));
        f.handler.handle(cmd()).await.unwrap();

        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionDeleted,
            "cus_1",
            "price_ent",
            Some("uid-1"),
        ));
        let result = f.handler.handle(cmd()).await.unwrap();

        assert!(matches!(result, HandleBillingWebhookResult::SubscriptionCanceled { .. }));
        let account = stored(&f).await;
        assert_eq!(account.subscription, SubscriptionPlan::Basic);
        assert_eq!(account.max_leads, 25);
        assert_eq!(account.billing.status.as_deref(), Some(CANCELED_STATUS));
        assert!(account.billing.stripe_subscription_id.is_none());
        assert_eq!(f.notifications.all().await.len(), 2);
    }

    #[tokio::test]
    async fn subscription_resolves_by_customer_email() {
        let f = fixture();
        f.provider.add_customer(Customer {
            id: "cus_7".to_string(),
            email: Some("Dana@Example.com".to_string()),
            name: None,
            created_at: 0,
        });
        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionCreated,
            "cus_7",
            "price_pro",
            None,
        ));

        f.handler.handle(cmd()).await.unwrap();

        assert_eq!(stored(&f).await.subscription, SubscriptionPlan::Pro);
    }

    #[tokio::test]
    async fn unresolvable_account_changes_nothing() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::subscription_event(
            WebhookEventType::SubscriptionCreated,
            "cus_unknown",
            "price_pro",
            None,
        ));

        let err = f.handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(err, BillingError::AccountNotResolved(_)));
        assert_eq!(stored(&f).await.subscription, SubscriptionPlan::Basic);
        assert!(f.notifications.all().await.is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payment Method and Invoice Events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_method_event_overwrites_summary() {
        let f = fixture();
        f.provider.set_webhook_event(WebhookEvent {
            id: "evt_pm".to_string(),
            event_type: WebhookEventType::PaymentMethodAttached,
            data: WebhookEventData::PaymentMethod {
                payment_method_id: "pm_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                method_type: "card".to_string(),
                card: Some(CardDetails {
                    brand: "mastercard".to_string(),
                    last4: "4444".to_string(),
                    exp_month: 3,
                    exp_year: 2029,
                }),
                account_id: Some("uid-1".to_string()),
            },
            created_at: 0,
            livemode: false,
        });

        f.handler.handle(cmd()).await.unwrap();

        let pm = stored(&f).await.billing.payment_method.unwrap();
        assert_eq!(pm.method_type, "card");
        assert_eq!(pm.last4.as_deref(), Some("4444"));
        assert_eq!(pm.brand.as_deref(), Some("mastercard"));
        assert_eq!(pm.exp_month, Some(3));
        assert_eq!(pm.exp_year, Some(2029));
        assert!(f.notifications.all().await.is_empty());
    }

    #[tokio::test]
    async fn paid_invoice_appends_success_notification() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::invoice_event(
            WebhookEventType::InvoicePaymentSucceeded,
            "cus_1",
            Some("dana@example.com"),
            4900,
        ));

        f.handler.handle(cmd()).await.unwrap();

        let notifications = f.notifications.all().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::PaymentSucceeded);
        assert!(notifications[0].message.contains("$49.00"));
    }

    #[tokio::test]
    async fn failed_invoice_reports_amount_due() {
        let f = fixture();
        f.provider.set_webhook_event(MockPaymentProvider::invoice_event(
            WebhookEventType::InvoicePaymentFailed,
            "cus_1",
            Some("dana@example.com"),
            9900,
        ));

        let result = f.handler.handle(cmd()).await.unwrap();

        assert_eq!(
            result,
            HandleBillingWebhookResult::InvoiceRecorded {
                account_id: account_id(),
                paid: false,
            }
        );
        let notifications = f.notifications.all().await;
        assert_eq!(notifications[0].kind, NotificationKind::PaymentFailed);
        assert!(notifications[0].message.contains("$99.00"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification and Unknown Events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_signature_is_rejected_without_mutation() {
        let provider = MockPaymentProvider::rejecting_webhooks();
        let accounts = Arc::new(InMemoryAccountRepository::with_accounts([Account::new(
            account_id(),
            None,
            &catalog(),
        )]));
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let handler = HandleBillingWebhookHandler::new(
            accounts.clone(),
            notifications.clone(),
            Arc::new(provider),
            catalog(),
        );

        let err = handler.handle(cmd()).await.unwrap_err();

        assert_eq!(err, BillingError::InvalidWebhookSignature);
        assert!(notifications.all().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_signed_payload_is_validation_error() {
        let f = fixture();
        let before = stored(&f).await;
        f.provider.set_method_error(
            "verify_webhook",
            PaymentError::malformed_webhook("Invalid invoice: missing field `customer`"),
        );

        let err = f.handler.handle(cmd()).await.unwrap_err();

        assert!(matches!(
            err,
            BillingError::ValidationFailed { ref field, ref message }
                if field == "payload" && message.contains("Invalid invoice")
        ));
        assert_eq!(stored(&f).await, before);
    }

    #[tokio::test]
    async fn unknown_event_is_ignored() {
        let f = fixture();
        let before = stored(&f).await;

        let result = f
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: br#"{"id":"evt_1","type":"charge.refunded"}"#.to_vec(),
                signature: "t=1,v1=abc".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            result,
            HandleBillingWebhookResult::Ignored {
                event_type: "charge.refunded".to_string()
            }
        );
        assert_eq!(stored(&f).await, before);
        assert!(f.notifications.all().await.is_empty());
    }

    #[tokio::test]
    async fn known_type_with_mismatched_data_is_error() {
        let f = fixture();

        let err = f
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: br#"{"id":"evt_1","type":"customer.subscription.created"}"#.to_vec(),
                signature: "t=1,v1=abc".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Infrastructure(_)));
    }
}
