//! Creem webhook event types.
//!
//! Defines the envelope and the typed payloads for the events we process.
//! The envelope's `object` field is polymorphic; [`CreemEvent::payload`]
//! narrows it into a tagged union discriminated by the event type, so each
//! handler works with a typed payload instead of poking at raw JSON.
//! Only fields relevant to our processing are captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::WebhookError;
use super::status::SubscriptionStatus;

/// Creem webhook event envelope.
///
/// Immutable once received. The envelope itself is never persisted; only the
/// effects derived from it are.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreemEvent {
    /// Unique identifier for the event.
    pub id: String,

    /// Type of event (e.g. "checkout.completed").
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created_at: i64,

    /// Event-specific data, shape depends on `event_type`.
    pub object: serde_json::Value,
}

impl CreemEvent {
    /// Parse the event type into a known enum variant.
    pub fn kind(&self) -> CreemEventKind {
        CreemEventKind::from_str(&self.event_type)
    }

    /// Narrow the polymorphic `object` into a typed payload.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` when the object does not match the
    /// shape implied by the event type.
    pub fn payload(&self) -> Result<EventPayload, WebhookError> {
        match self.kind() {
            CreemEventKind::CheckoutCompleted => serde_json::from_value(self.object.clone())
                .map(EventPayload::Checkout)
                .map_err(|e| WebhookError::ParseError(format!("checkout payload: {}", e))),
            CreemEventKind::Unknown => Ok(EventPayload::Unknown),
            _ => serde_json::from_value(self.object.clone())
                .map(EventPayload::Subscription)
                .map_err(|e| WebhookError::ParseError(format!("subscription payload: {}", e))),
        }
    }
}

/// Known Creem event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreemEventKind {
    /// A checkout finished; may carry a credit purchase or a subscription.
    CheckoutCompleted,
    /// Subscription became active.
    SubscriptionActive,
    /// Subscription invoice was paid.
    SubscriptionPaid,
    /// Subscription was canceled.
    SubscriptionCanceled,
    /// Subscription expired.
    SubscriptionExpired,
    /// Subscription entered its trial period.
    SubscriptionTrialing,
    /// Unknown or unhandled event type.
    Unknown,
}

impl CreemEventKind {
    /// Parse event kind from the wire string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.completed" => Self::CheckoutCompleted,
            "subscription.active" => Self::SubscriptionActive,
            "subscription.paid" => Self::SubscriptionPaid,
            "subscription.canceled" => Self::SubscriptionCanceled,
            "subscription.expired" => Self::SubscriptionExpired,
            "subscription.trialing" => Self::SubscriptionTrialing,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Creem event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted => "checkout.completed",
            Self::SubscriptionActive => "subscription.active",
            Self::SubscriptionPaid => "subscription.paid",
            Self::SubscriptionCanceled => "subscription.canceled",
            Self::SubscriptionExpired => "subscription.expired",
            Self::SubscriptionTrialing => "subscription.trialing",
            Self::Unknown => "unknown",
        }
    }
}

/// Typed view of the envelope's polymorphic `object` field.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Checkout(CheckoutPayload),
    Subscription(SubscriptionPayload),
    /// Event type we don't handle; the raw object stays in the envelope.
    Unknown,
}

/// Payload of a `checkout.completed` event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutPayload {
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,

    pub customer: CreemCustomer,

    #[serde(default)]
    pub order: Option<CreemOrder>,

    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,

    /// Embedded subscription for subscription-product checkouts.
    #[serde(default)]
    pub subscription: Option<SubscriptionPayload>,
}

impl CheckoutPayload {
    /// Resolve the application user id for this checkout.
    ///
    /// Metadata attached to the order wins; checkout-level metadata is the
    /// fallback. Earlier revisions of the source system disagreed on this
    /// order, so the rule is fixed here: order first.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MissingMetadata` when neither location carries
    /// a user id.
    pub fn resolve_user_id(&self) -> Result<&str, WebhookError> {
        self.order
            .as_ref()
            .and_then(|o| o.metadata.as_ref())
            .and_then(|m| m.user_id.as_deref())
            .or_else(|| self.metadata.as_ref().and_then(|m| m.user_id.as_deref()))
            .ok_or(WebhookError::MissingMetadata("user_id"))
    }

    /// Whether this checkout is for a credits product.
    ///
    /// `product_type` is read from checkout-level metadata first, order
    /// metadata second (the opposite of the user-id precedence, matching
    /// how the provider actually populates these fields).
    pub fn is_credit_product(&self) -> bool {
        self.metadata_product_type() == Some("credits")
    }

    /// The credit purchase carried by this checkout, if any.
    ///
    /// Returns `None` for non-credit products, and also for credit products
    /// that carry no amount (those are acknowledged without a grant).
    pub fn credit_purchase(&self) -> Option<CreditPurchase<'_>> {
        if !self.is_credit_product() {
            return None;
        }

        let amount = self
            .metadata
            .as_ref()
            .and_then(|m| m.credits)
            .or_else(|| self.order_metadata().and_then(|m| m.credits))?;

        Some(CreditPurchase {
            amount,
            order_id: self.order.as_ref().map(|o| o.id.as_str()),
        })
    }

    fn metadata_product_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.product_type.as_deref())
            .or_else(|| self.order_metadata().and_then(|m| m.product_type.as_deref()))
    }

    fn order_metadata(&self) -> Option<&CheckoutMetadata> {
        self.order.as_ref().and_then(|o| o.metadata.as_ref())
    }
}

/// A credit purchase extracted from a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditPurchase<'a> {
    pub amount: i64,
    /// Originating order id, used as the ledger dedup key.
    pub order_id: Option<&'a str>,
}

/// Order embedded in a checkout payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreemOrder {
    pub id: String,

    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
}

/// Metadata attached to a checkout or its order.
///
/// Unknown keys are ignored; the provider lets merchants attach arbitrary
/// metadata and we only care about these three.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub product_type: Option<String>,

    /// Credit amount. The provider has sent both JSON numbers and numeric
    /// strings here, so both are accepted.
    #[serde(default, deserialize_with = "credits_amount")]
    pub credits: Option<i64>,
}

/// Customer object as sent by Creem.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreemCustomer {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub country: Option<String>,
}

/// Customer reference on a subscription payload: either a bare id string or
/// a full customer object, depending on expansion.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    Id(String),
    Full(CreemCustomer),
}

impl CustomerRef {
    /// Materialize into a customer, with empty profile fields when only the
    /// id was sent. Upserts treat absent fields as "leave unchanged".
    pub fn to_customer(&self) -> CreemCustomer {
        match self {
            Self::Id(id) => CreemCustomer {
                id: id.clone(),
                email: None,
                name: None,
                country: None,
            },
            Self::Full(customer) => customer.clone(),
        }
    }
}

/// Product reference: a plain identifier or an embedded product object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Full(ProductObject),
}

/// Embedded product object; only the id matters for synchronization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductObject {
    pub id: String,
}

impl ProductRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Full(product) => &product.id,
        }
    }
}

/// Payload of the `subscription.*` events, also embedded in checkouts.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub id: String,

    pub status: SubscriptionStatus,

    #[serde(default)]
    pub customer: Option<CustomerRef>,

    #[serde(default)]
    pub product: Option<ProductRef>,

    #[serde(default)]
    pub current_period_start_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub current_period_end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,

    /// Kept as raw JSON because it is persisted verbatim alongside the
    /// subscription row.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl SubscriptionPayload {
    /// Application user id from subscription metadata, if present.
    pub fn user_id(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("user_id")?.as_str()
    }

    /// Derived product id, from a plain identifier or an embedded object.
    pub fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.id())
    }
}

fn credits_amount<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checkout_event(object: serde_json::Value) -> CreemEvent {
        CreemEvent {
            id: "evt_test_1".to_string(),
            event_type: "checkout.completed".to_string(),
            created_at: 1704067200,
            object,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Envelope Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn deserialize_minimal_envelope() {
        let json = r#"{
            "id": "evt_123",
            "eventType": "checkout.completed",
            "created_at": 1704067200,
            "object": {}
        }"#;

        let event: CreemEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.event_type, "checkout.completed");
        assert_eq!(event.created_at, 1704067200);
        assert_eq!(event.kind(), CreemEventKind::CheckoutCompleted);
    }

    #[test]
    fn malformed_envelope_fails() {
        let result: Result<CreemEvent, _> = serde_json::from_str(r#"{"id": "evt_1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn event_kind_roundtrip() {
        let kinds = [
            CreemEventKind::CheckoutCompleted,
            CreemEventKind::SubscriptionActive,
            CreemEventKind::SubscriptionPaid,
            CreemEventKind::SubscriptionCanceled,
            CreemEventKind::SubscriptionExpired,
            CreemEventKind::SubscriptionTrialing,
        ];

        for kind in kinds {
            assert_eq!(CreemEventKind::from_str(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_event_kind() {
        assert_eq!(CreemEventKind::from_str("foo.bar"), CreemEventKind::Unknown);
    }

    #[test]
    fn unknown_event_payload_is_unknown() {
        let event = CreemEvent {
            id: "evt_u".to_string(),
            event_type: "refund.created".to_string(),
            created_at: 0,
            object: json!({"anything": true}),
        };

        assert!(matches!(event.payload().unwrap(), EventPayload::Unknown));
    }

    #[test]
    fn checkout_object_with_wrong_shape_fails() {
        let event = checkout_event(json!({"id": "ch_1"}));

        let result = event.payload();

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Payload Tests
    // ══════════════════════════════════════════════════════════════

    fn full_checkout() -> CheckoutPayload {
        serde_json::from_value(json!({
            "id": "ch_1",
            "status": "completed",
            "customer": {
                "id": "cus_1",
                "email": "ada@example.com",
                "name": "Ada",
                "country": "DE"
            },
            "order": {
                "id": "ord_1",
                "metadata": {"user_id": "user-from-order"}
            },
            "metadata": {
                "user_id": "user-from-checkout",
                "product_type": "credits",
                "credits": 100
            }
        }))
        .unwrap()
    }

    #[test]
    fn user_id_prefers_order_metadata() {
        let checkout = full_checkout();
        assert_eq!(checkout.resolve_user_id().unwrap(), "user-from-order");
    }

    #[test]
    fn user_id_falls_back_to_checkout_metadata() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "order": {"id": "ord_1"},
            "metadata": {"user_id": "fallback-user"}
        }))
        .unwrap();

        assert_eq!(checkout.resolve_user_id().unwrap(), "fallback-user");
    }

    #[test]
    fn user_id_missing_everywhere_fails() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"}
        }))
        .unwrap();

        assert!(matches!(
            checkout.resolve_user_id(),
            Err(WebhookError::MissingMetadata("user_id"))
        ));
    }

    #[test]
    fn credit_purchase_extracted_with_order_id() {
        let checkout = full_checkout();

        let purchase = checkout.credit_purchase().unwrap();

        assert_eq!(purchase.amount, 100);
        assert_eq!(purchase.order_id, Some("ord_1"));
    }

    #[test]
    fn credit_amount_accepts_numeric_string() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "metadata": {"product_type": "credits", "credits": "250"}
        }))
        .unwrap();

        assert_eq!(checkout.credit_purchase().unwrap().amount, 250);
    }

    #[test]
    fn credit_amount_from_order_metadata_fallback() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "order": {"id": "ord_9", "metadata": {"credits": 40}},
            "metadata": {"product_type": "credits"}
        }))
        .unwrap();

        let purchase = checkout.credit_purchase().unwrap();
        assert_eq!(purchase.amount, 40);
        assert_eq!(purchase.order_id, Some("ord_9"));
    }

    #[test]
    fn credit_product_without_amount_yields_none() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "metadata": {"product_type": "credits"}
        }))
        .unwrap();

        assert!(checkout.is_credit_product());
        assert!(checkout.credit_purchase().is_none());
    }

    #[test]
    fn non_credit_product_yields_no_purchase() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "metadata": {"product_type": "subscription", "credits": 100}
        }))
        .unwrap();

        assert!(!checkout.is_credit_product());
        assert!(checkout.credit_purchase().is_none());
    }

    #[test]
    fn checkout_with_embedded_subscription() {
        let checkout: CheckoutPayload = serde_json::from_value(json!({
            "id": "ch_1",
            "customer": {"id": "cus_1"},
            "subscription": {
                "id": "sub_1",
                "status": "active",
                "product": "prod_1"
            }
        }))
        .unwrap();

        let subscription = checkout.subscription.unwrap();
        assert_eq!(subscription.id, "sub_1");
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Payload Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_payload_full_shape() {
        let subscription: SubscriptionPayload = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "trialing",
            "customer": {"id": "cus_1", "email": "ada@example.com"},
            "product": {"id": "prod_7", "name": "Pro plan"},
            "current_period_start_date": "2024-01-01T00:00:00Z",
            "current_period_end_date": "2024-02-01T00:00:00Z",
            "canceled_at": null,
            "metadata": {"user_id": "user-1"}
        }))
        .unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::Trialing);
        assert_eq!(subscription.user_id(), Some("user-1"));
        assert_eq!(subscription.product_id(), Some("prod_7"));
        assert!(subscription.current_period_start_date.is_some());
        assert!(subscription.canceled_at.is_none());
    }

    #[test]
    fn product_as_plain_id_string() {
        let subscription: SubscriptionPayload = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "product": "prod_plain"
        }))
        .unwrap();

        assert_eq!(subscription.product_id(), Some("prod_plain"));
    }

    #[test]
    fn customer_as_bare_id_string() {
        let subscription: SubscriptionPayload = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "customer": "cus_bare"
        }))
        .unwrap();

        let customer = subscription.customer.unwrap().to_customer();
        assert_eq!(customer.id, "cus_bare");
        assert!(customer.email.is_none());
    }

    #[test]
    fn subscription_without_user_id_metadata() {
        let subscription: SubscriptionPayload = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "canceled",
            "metadata": {"plan": "pro"}
        }))
        .unwrap();

        assert_eq!(subscription.user_id(), None);
    }

    #[test]
    fn unknown_subscription_status_fails_parse() {
        let result: Result<SubscriptionPayload, _> = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "past_due"
        }));

        assert!(result.is_err());
    }
}
