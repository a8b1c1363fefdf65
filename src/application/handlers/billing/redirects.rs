//! Return URLs for hosted checkout and portal pages.

/// Placeholder Stripe replaces with the created checkout session ID.
pub const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Builds the partner app URLs that hosted pages redirect back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrls {
    base: String,
}

impl RedirectUrls {
    /// Trailing slashes on `base` are dropped.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn checkout_success(&self) -> String {
        format!(
            "{}/billing?checkout=success&session_id={}",
            self.base, CHECKOUT_SESSION_PLACEHOLDER
        )
    }

    pub fn checkout_canceled(&self) -> String {
        format!("{}/billing?checkout=canceled", self.base)
    }

    pub fn portal_return(&self) -> String {
        format!("{}/billing", self.base)
    }
}
