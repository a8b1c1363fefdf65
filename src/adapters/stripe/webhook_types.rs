//! Stripe-specific wire types.
//!
//! These types represent Stripe API objects as they arrive in webhook payloads
//! and API responses. They are designed to:
//! - Parse actual Stripe JSON accurately
//! - Map to port types for further processing
//! - Tolerate missing optional fields across API versions

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ports::CardDetails;

/// Metadata key carrying the internal account ID on Stripe objects.
pub const ACCOUNT_ID_METADATA_KEY: &str = "account_id";

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureParseError {
    /// Header is empty or missing.
    MissingHeader,
    /// Missing timestamp component (t=...).
    MissingTimestamp,
    /// Missing v1 signature component.
    MissingV1Signature,
    InvalidTimestamp,
    /// Invalid signature format (not valid hex).
    InvalidSignatureFormat,
}

impl std::fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "Missing Stripe-Signature header"),
            Self::MissingTimestamp => write!(f, "Missing timestamp (t=) in signature"),
            Self::MissingV1Signature => write!(f, "Missing v1 signature in header"),
            Self::InvalidTimestamp => write!(f, "Invalid timestamp format"),
            Self::InvalidSignatureFormat => write!(f, "Invalid signature format (not valid hex)"),
        }
    }
}

impl std::error::Error for SignatureParseError {}

/// Parsed Stripe-Signature header components.
///
/// The header format is `t=timestamp,v1=signature[,v1=signature...]`. Stripe
/// sends several `v1` entries while a signing secret is being rolled, so all
/// of them are kept.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe signed the payload.
    pub timestamp: i64,

    /// v1 signatures (HMAC-SHA256, hex-decoded).
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse a Stripe-Signature header into components.
    ///
    /// Unknown keys (such as the legacy `v0`) are ignored.
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex_decode(value.trim())
                            .ok_or(SignatureParseError::InvalidSignatureFormat)?,
                    );
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

/// Encode bytes to a lowercase hex string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Event Envelope
// ════════════════════════════════════════════════════════════════════════════════

/// Raw Stripe webhook event as received from the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeWebhookEvent {
    /// Unique event identifier (evt_...).
    pub id: String,

    /// Event type (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp when the event was created.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    pub api_version: Option<String>,
}

/// Event data container.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object affected by this event.
    pub object: serde_json::Value,

    /// Previous values for updated fields (on update events).
    pub previous_attributes: Option<serde_json::Value>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Object Types
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    pub email: Option<String>,

    pub name: Option<String>,

    /// Absent on deleted customers.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    pub status: String,

    /// Current period end (Unix timestamp). Newer API versions carry it on
    /// the subscription items instead.
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Subscription items (price/quantity pairs).
    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,
}

impl StripeSubscription {
    /// First subscription item, which carries the subscribed price.
    pub fn primary_item(&self) -> Option<&StripeSubscriptionItem> {
        self.items.data.first()
    }

    /// Period end from the subscription, falling back to its first item.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.primary_item().and_then(|item| item.current_period_end))
    }

    pub fn account_id(&self) -> Option<String> {
        metadata_account_id(&self.metadata)
    }
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub id: String,

    pub price: StripePrice,

    #[serde(default = "default_quantity")]
    pub quantity: i64,

    pub current_period_end: Option<i64>,
}

fn default_quantity() -> i64 {
    1
}

/// Stripe Price object (embedded in subscription items).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    pub id: String,

    /// Unit amount in minor units.
    pub unit_amount: Option<i64>,

    /// Currency (lowercase, e.g., "usd").
    pub currency: String,
}

/// Generic Stripe list wrapper.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

/// Stripe PaymentMethod object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentMethod {
    /// Unique payment method identifier (pm_...).
    pub id: String,

    #[serde(rename = "type")]
    pub method_type: String,

    /// Owning customer; `None` once detached.
    pub customer: Option<String>,

    pub card: Option<StripeCard>,

    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripePaymentMethod {
    pub fn account_id(&self) -> Option<String> {
        metadata_account_id(&self.metadata)
    }
}

/// Card details on a payment method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCard {
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: u32,
}

impl From<StripeCard> for CardDetails {
    fn from(card: StripeCard) -> Self {
        CardDetails {
            brand: card.brand,
            last4: card.last4,
            exp_month: card.exp_month,
            exp_year: card.exp_year,
        }
    }
}

/// Stripe Invoice object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeInvoice {
    /// Unique invoice identifier (in_...).
    pub id: String,

    pub customer: String,

    /// Email of the billed customer at finalization time.
    pub customer_email: Option<String>,

    pub subscription: Option<String>,

    /// Amount paid in minor units.
    #[serde(default)]
    pub amount_paid: i64,

    /// Amount due in minor units.
    #[serde(default)]
    pub amount_due: i64,

    pub currency: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Snapshot of the subscription that generated the invoice.
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

impl StripeInvoice {
    /// Account ID from invoice metadata, or from the subscription snapshot.
    pub fn account_id(&self) -> Option<String> {
        metadata_account_id(&self.metadata).or_else(|| {
            self.subscription_details
                .as_ref()
                .and_then(|details| metadata_account_id(&details.metadata))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionDetails {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Checkout Session as returned on creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted page URL; absent once the session completes.
    pub url: Option<String>,

    #[serde(default)]
    pub expires_at: i64,
}

/// Stripe billing portal session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

/// Error body returned by the Stripe API.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

fn metadata_account_id(metadata: &HashMap<String, String>) -> Option<String> {
    metadata
        .get(ACCOUNT_ID_METADATA_KEY)
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(String::from)
}
