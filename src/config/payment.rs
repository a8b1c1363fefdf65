//! Payment configuration

use serde::Deserialize;

use crate::domain::billing::{PlanCatalog, SubscriptionPlan};

use super::error::ValidationError;
use super::server::Environment;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    #[serde(default)]
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    #[serde(default)]
    pub stripe_webhook_secret: String,

    /// Override for the Stripe API host
    pub stripe_api_base_url: Option<String>,

    /// Partner app URL that checkout and portal pages redirect back to
    #[serde(default)]
    pub base_url: String,

    /// Stripe price ID for the Basic plan
    pub basic_price_id: Option<String>,

    /// Stripe price ID for the Pro plan
    pub pro_price_id: Option<String>,

    /// Stripe price ID for the Enterprise plan
    pub enterprise_price_id: Option<String>,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Redirect base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Build the price ID to plan table.
    pub fn plan_catalog(&self) -> PlanCatalog {
        let mut catalog = PlanCatalog::new();
        for (price, plan) in [
            (&self.basic_price_id, SubscriptionPlan::Basic),
            (&self.pro_price_id, SubscriptionPlan::Pro),
            (&self.enterprise_price_id, SubscriptionPlan::Enterprise),
        ] {
            if let Some(price) = price {
                catalog = catalog.with_price(price.trim(), plan);
            }
        }
        catalog
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        let base_url = self.base_url();
        if base_url.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__BASE_URL"));
        }
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if *environment == Environment::Production && !base_url.starts_with("https://") {
            return Err(ValidationError::BaseUrlMustBeHttps);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            base_url: "https://partners.example.com/".to_string(),
            basic_price_id: Some("price_basic".to_string()),
            pro_price_id: Some("price_pro".to_string()),
            enterprise_price_id: Some("price_enterprise".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_test_mode() {
        let config = valid();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        assert_eq!(valid().base_url(), "https://partners.example.com");
    }

    #[test]
    fn test_plan_catalog_from_price_ids() {
        let catalog = valid().plan_catalog();
        assert_eq!(catalog.plan_for_price("price_pro"), Some(SubscriptionPlan::Pro));
        assert_eq!(
            catalog.plan_for_price("price_enterprise"),
            Some(SubscriptionPlan::Enterprise)
        );
    }

    #[test]
    fn test_plan_catalog_skips_missing_prices() {
        let config = PaymentConfig {
            pro_price_id: None,
            ..valid()
        };
        assert_eq!(config.plan_catalog().price_for_plan(SubscriptionPlan::Pro), None);
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"))
        );
    }

    #[test]
    fn test_validation_invalid_api_key_prefix() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(), // publishable key
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidStripeKey)
        );
    }

    #[test]
    fn test_validation_invalid_webhook_secret_prefix() {
        let config = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_base_url() {
        let config = PaymentConfig {
            base_url: String::new(),
            ..valid()
        };
        assert!(config.validate(&Environment::Development).is_err());

        let config = PaymentConfig {
            base_url: "partners.example.com".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidBaseUrl)
        );

        let config = PaymentConfig {
            base_url: "http://localhost:5173".to_string(),
            ..valid()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::BaseUrlMustBeHttps)
        );
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid().validate(&Environment::Production).is_ok());
    }
}
