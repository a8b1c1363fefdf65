//! Subscription plans and the price lookup table.
//!
//! Partners subscribe to one of three plans. Each plan maps to exactly one
//! provider price ID and grants a fixed lead quota.

use serde::{Deserialize, Serialize};

/// Subscription plan a partner account is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionPlan {
    /// Entry plan, also the plan accounts fall back to on cancellation.
    #[default]
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    /// All plans, lowest first.
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Basic,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Enterprise,
    ];

    /// Returns the display name stored on the account record.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "Basic",
            SubscriptionPlan::Pro => "Pro",
            SubscriptionPlan::Enterprise => "Enterprise",
        }
    }

    /// Returns the number of leads the plan allows.
    pub fn lead_quota(&self) -> u32 {
        match self {
            SubscriptionPlan::Basic => 25,
            SubscriptionPlan::Pro => 100,
            SubscriptionPlan::Enterprise => 500,
        }
    }

    /// Parses a stored plan name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|plan| plan.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Static price ID to plan table.
///
/// Built once at startup from configuration and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    entries: Vec<(String, SubscriptionPlan)>,
}

impl PlanCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the price ID for a plan. Blank IDs are skipped.
    pub fn with_price(mut self, price_id: impl Into<String>, plan: SubscriptionPlan) -> Self {
        let price_id = price_id.into();
        if price_id.trim().is_empty() {
            return self;
        }
        self.entries.retain(|(_, p)| *p != plan);
        self.entries.push((price_id, plan));
        self
    }

    /// Looks up the plan billed under a price ID.
    pub fn plan_for_price(&self, price_id: &str) -> Option<SubscriptionPlan> {
        self.entries
            .iter()
            .find(|(id, _)| id == price_id)
            .map(|(_, plan)| *plan)
    }

    /// Returns the price ID configured for a plan.
    pub fn price_for_plan(&self, plan: SubscriptionPlan) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, p)| *p == plan)
            .map(|(id, _)| id.as_str())
    }

    /// Returns true if the price ID belongs to a known plan.
    pub fn is_known_price(&self, price_id: &str) -> bool {
        self.plan_for_price(price_id).is_some()
    }

    /// True when no price IDs are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The plan accounts start on and return to after cancellation.
    pub fn default_plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::default()
    }

    /// The lead quota of the default plan.
    pub fn default_quota(&self) -> u32 {
        self.default_plan().lead_quota()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlanCatalog {
        PlanCatalog::new()
            .with_price("price_basic", SubscriptionPlan::Basic)
            .with_price("price_pro", SubscriptionPlan::Pro)
            .with_price("price_enterprise", SubscriptionPlan::Enterprise)
    }

    #[test]
    fn pro_plan_allows_one_hundred_leads() {
        assert_eq!(SubscriptionPlan::Pro.lead_quota(), 100);
    }

    #[test]
    fn quotas_increase_with_plan() {
        let quotas: Vec<u32> = SubscriptionPlan::ALL.iter().map(|p| p.lead_quota()).collect();
        assert!(quotas.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn lookup_by_price() {
        let catalog = catalog();
        assert_eq!(catalog.plan_for_price("price_pro"), Some(SubscriptionPlan::Pro));
        assert_eq!(
            catalog.plan_for_price("price_enterprise"),
            Some(SubscriptionPlan::Enterprise)
        );
        assert_eq!(catalog.plan_for_price("price_unknown"), None);
    }

    #[test]
    fn price_for_plan_returns_configured_id() {
        assert_eq!(catalog().price_for_plan(SubscriptionPlan::Basic), Some("price_basic"));
    }

    #[test]
    fn blank_price_is_not_registered() {
        let catalog = PlanCatalog::new().with_price("  ", SubscriptionPlan::Pro);
        assert_eq!(catalog.price_for_plan(SubscriptionPlan::Pro), None);
        assert!(!catalog.is_known_price("  "));
    }

    #[test]
    fn re_registering_a_plan_replaces_its_price() {
        let catalog = catalog().with_price("price_pro_v2", SubscriptionPlan::Pro);
        assert_eq!(catalog.plan_for_price("price_pro"), None);
        assert_eq!(catalog.plan_for_price("price_pro_v2"), Some(SubscriptionPlan::Pro));
    }

    #[test]
    fn default_is_lowest_plan() {
        let catalog = catalog();
        assert_eq!(catalog.default_plan(), SubscriptionPlan::Basic);
        assert_eq!(catalog.default_quota(), 25);
    }

    #[test]
    fn from_name_ignores_case() {
        assert_eq!(SubscriptionPlan::from_name("pro"), Some(SubscriptionPlan::Pro));
        assert_eq!(SubscriptionPlan::from_name(" Enterprise "), Some(SubscriptionPlan::Enterprise));
        assert_eq!(SubscriptionPlan::from_name("gold"), None);
    }
}
