//! Append-only notifications shown to partners.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AccountId, NotificationId, Timestamp};

use super::plan::SubscriptionPlan;

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Subscription,
    PaymentSucceeded,
    PaymentFailed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Subscription => "subscription",
            NotificationKind::PaymentSucceeded => "payment_succeeded",
            NotificationKind::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subscription" => Some(NotificationKind::Subscription),
            "payment_succeeded" => Some(NotificationKind::PaymentSucceeded),
            "payment_failed" => Some(NotificationKind::PaymentFailed),
            _ => None,
        }
    }
}

/// A notification record attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub account_id: AccountId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    fn unread(
        account_id: AccountId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            account_id,
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            created_at: Timestamp::now(),
        }
    }

    pub fn subscription_updated(account_id: AccountId, plan: SubscriptionPlan) -> Self {
        Self::unread(
            account_id,
            NotificationKind::Subscription,
            "Subscription updated",
            format!(
                "Your subscription is now on the {} plan with up to {} leads.",
                plan.display_name(),
                plan.lead_quota()
            ),
        )
    }

    pub fn subscription_canceled(account_id: AccountId, fallback: SubscriptionPlan) -> Self {
        Self::unread(
            account_id,
            NotificationKind::Subscription,
            "Subscription canceled",
            format!(
                "Your subscription has been canceled. Your account is back on the {} plan.",
                fallback.display_name()
            ),
        )
    }

    pub fn payment_succeeded(account_id: AccountId, amount: i64, currency: &str) -> Self {
        Self::unread(
            account_id,
            NotificationKind::PaymentSucceeded,
            "Payment received",
            format!(
                "We received your payment of {}. Thank you!",
                format_amount(amount, currency)
            ),
        )
    }

    pub fn payment_failed(account_id: AccountId, amount: i64, currency: &str) -> Self {
        Self::unread(
            account_id,
            NotificationKind::PaymentFailed,
            "Payment failed",
            format!(
                "We could not process your payment of {}. Please update your payment method.",
                format_amount(amount, currency)
            ),
        )
    }
}

/// Formats an amount given in minor units, e.g. `4900, "usd"` as `$49.00`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let major = abs / 100;
    let minor = abs % 100;
    match currency.to_ascii_lowercase().as_str() {
        "usd" | "cad" | "aud" => format!("{}${}.{:02}", sign, major, minor),
        "eur" => format!("{}€{}.{:02}", sign, major, minor),
        "gbp" => format!("{}£{}.{:02}", sign, major, minor),
        other => format!("{}{}.{:02} {}", sign, major, minor, other.to_ascii_uppercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_id() -> AccountId {
        AccountId::new("uid-1").unwrap()
    }

    #[test]
    fn new_notifications_are_unread() {
        let n = Notification::subscription_updated(account_id(), SubscriptionPlan::Pro);
        assert!(!n.read);
        assert_eq!(n.kind, NotificationKind::Subscription);
        assert_eq!(n.title, "Subscription updated");
        assert!(n.message.contains("Pro"));
        assert!(n.message.contains("100"));
    }

    #[test]
    fn canceled_notification_names_fallback_plan() {
        let n = Notification::subscription_canceled(account_id(), SubscriptionPlan::Basic);
        assert_eq!(n.title, "Subscription canceled");
        assert!(n.message.contains("Basic"));
    }

    #[test]
    fn payment_notifications_include_amount() {
        let ok = Notification::payment_succeeded(account_id(), 4900, "usd");
        assert_eq!(ok.kind, NotificationKind::PaymentSucceeded);
        assert!(ok.message.contains("$49.00"));

        let failed = Notification::payment_failed(account_id(), 12345, "eur");
        assert_eq!(failed.kind, NotificationKind::PaymentFailed);
        assert!(failed.message.contains("€123.45"));
    }

    #[test]
    fn format_amount_handles_unknown_currency() {
        assert_eq!(format_amount(500, "jpy"), "5.00 JPY");
        assert_eq!(format_amount(-250, "usd"), "-$2.50");
    }

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in [
            NotificationKind::Subscription,
            NotificationKind::PaymentSucceeded,
            NotificationKind::PaymentFailed,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("other"), None);
    }

    #[test]
    fn serializes_kind_as_type() {
        let n = Notification::payment_failed(account_id(), 100, "usd");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "payment_failed");
        assert_eq!(json["read"], false);
        assert_eq!(json["accountId"], "uid-1");
    }
}
