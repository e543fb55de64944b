//! Process Creem webhook command handler.
//!
//! The full pipeline for one delivery: verify the signature against the raw
//! body, parse the envelope, dispatch on the event type, and synchronize
//! state through the BillingStore port. Verification and synchronization
//! both complete before the delivery is acknowledged, so a success response
//! means the state change is durable.

use std::sync::Arc;

use crate::domain::billing::{
    CreemEvent, CreemEventKind, CreemWebhookVerifier, EventPayload, WebhookError,
};
use crate::ports::BillingStore;

/// Command to process a webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Raw request body, exactly as received. Signature verification runs
    /// over these bytes, so they must not be re-serialized first.
    pub payload: Vec<u8>,
    /// Value of the `creem-signature` header.
    pub signature: String,
}

/// Result of processing a webhook delivery.
#[derive(Debug)]
pub enum ProcessWebhookResult {
    /// A credit purchase was applied (or deduplicated).
    CreditsGranted {
        customer_id: uuid::Uuid,
        amount: i64,
        balance: i64,
    },
    /// A subscription was created or updated.
    SubscriptionSynced {
        customer_id: uuid::Uuid,
        subscription_id: uuid::Uuid,
        status: &'static str,
    },
    /// Only the customer record changed.
    CustomerSynced { customer_id: uuid::Uuid },
    /// Event type is not handled; acknowledged without side effects.
    Ignored { event_type: String },
}

/// Handler for processing Creem webhooks.
pub struct ProcessWebhookHandler {
    verifier: CreemWebhookVerifier,
    store: Arc<dyn BillingStore>,
}

impl ProcessWebhookHandler {
    /// Creates a new handler with the given verifier and store.
    pub fn new(verifier: CreemWebhookVerifier, store: Arc<dyn BillingStore>) -> Self {
        Self { verifier, store }
    }

    /// Processes one webhook delivery.
    ///
    /// # Errors
    ///
    /// - `WebhookError::InvalidSignature` when verification fails
    /// - `WebhookError::ParseError` when the body is not a valid event
    /// - `WebhookError::MissingMetadata` / `MissingField` when a handled
    ///   event lacks required data
    /// - `WebhookError::Store` when synchronization fails
    pub async fn handle(
        &self,
        command: ProcessWebhookCommand,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        if !self.verifier.verify(&command.payload, &command.signature) {
            tracing::warn!("webhook signature verification failed");
            return Err(WebhookError::InvalidSignature);
        }

        let event: CreemEvent = serde_json::from_slice(&command.payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "processing webhook event"
        );

        match event.kind() {
            CreemEventKind::CheckoutCompleted => self.handle_checkout_completed(&event).await,
            CreemEventKind::Unknown => {
                tracing::info!(event_type = %event.event_type, "ignoring unhandled event type");
                Ok(ProcessWebhookResult::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
            _ => self.handle_subscription_event(&event).await,
        }
    }

    async fn handle_checkout_completed(
        &self,
        event: &CreemEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let EventPayload::Checkout(checkout) = event.payload()? else {
            return Err(WebhookError::ParseError(
                "checkout event carried a non-checkout object".to_string(),
            ));
        };

        let user_id = checkout.resolve_user_id()?;
        let customer_id = self
            .store
            .upsert_customer(&checkout.customer, user_id)
            .await?;

        if checkout.is_credit_product() {
            let Some(purchase) = checkout.credit_purchase() else {
                tracing::warn!(
                    checkout_id = %checkout.id,
                    "credit checkout carried no credit amount"
                );
                return Ok(ProcessWebhookResult::CustomerSynced { customer_id });
            };

            let description = format!("Purchased {} credits", purchase.amount);
            let balance = self
                .store
                .add_credits(customer_id, purchase.amount, purchase.order_id, &description)
                .await?;

            tracing::info!(
                customer_id = %customer_id,
                amount = purchase.amount,
                balance,
                "credits granted"
            );

            return Ok(ProcessWebhookResult::CreditsGranted {
                customer_id,
                amount: purchase.amount,
                balance,
            });
        }

        if let Some(subscription) = &checkout.subscription {
            let subscription_id = self
                .store
                .upsert_subscription(subscription, customer_id)
                .await?;

            return Ok(ProcessWebhookResult::SubscriptionSynced {
                customer_id,
                subscription_id,
                status: subscription.status.as_str(),
            });
        }

        Ok(ProcessWebhookResult::CustomerSynced { customer_id })
    }

    async fn handle_subscription_event(
        &self,
        event: &CreemEvent,
    ) -> Result<ProcessWebhookResult, WebhookError> {
        let EventPayload::Subscription(subscription) = event.payload()? else {
            return Err(WebhookError::ParseError(
                "subscription event carried a non-subscription object".to_string(),
            ));
        };

        let user_id = subscription
            .user_id()
            .ok_or(WebhookError::MissingMetadata("user_id"))?
            .to_string();

        let customer = subscription
            .customer
            .as_ref()
            .ok_or(WebhookError::MissingField("customer"))?
            .to_customer();

        let customer_id = self.store.upsert_customer(&customer, &user_id).await?;
        let subscription_id = self
            .store
            .upsert_subscription(&subscription, customer_id)
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            subscription_id = %subscription_id,
            status = subscription.status.as_str(),
            "subscription synchronized"
        );

        Ok(ProcessWebhookResult::SubscriptionSynced {
            customer_id,
            subscription_id,
            status: subscription.status.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::compute_test_signature;
    use crate::ports::BillingReader;
    use serde_json::json;

    const SECRET: &str = "whsec_handler_test_secret";

    fn handler() -> (ProcessWebhookHandler, Arc<InMemoryBillingStore>) {
        let store = Arc::new(InMemoryBillingStore::new());
        let handler = ProcessWebhookHandler::new(
            CreemWebhookVerifier::new(SECRET),
            store.clone() as Arc<dyn BillingStore>,
        );
        (handler, store)
    }

    fn signed_command(body: serde_json::Value) -> ProcessWebhookCommand {
        let payload = serde_json::to_vec(&body).unwrap();
        let signature = compute_test_signature(SECRET, &payload);
        ProcessWebhookCommand { payload, signature }
    }

    fn credit_checkout_event() -> serde_json::Value {
        json!({
            "id": "evt_1",
            "eventType": "checkout.completed",
            "created_at": 1704067200,
            "object": {
                "id": "ch_1",
                "customer": {"id": "cus_1", "email": "ada@example.com"},
                "order": {"id": "ord_1", "metadata": {"user_id": "user-1"}},
                "metadata": {"product_type": "credits", "credits": 100}
            }
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invalid_signature_rejected_before_any_write() {
        let (handler, store) = handler();
        let payload = serde_json::to_vec(&credit_checkout_event()).unwrap();

        let result = handler
            .handle(ProcessWebhookCommand {
                payload,
                signature: "deadbeef".to_string(),
            })
            .await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
        assert_eq!(store.customer_count(), 0);
        assert_eq!(store.ledger_count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_with_valid_signature_is_parse_error() {
        let (handler, _) = handler();
        let payload = b"{not json".to_vec();
        let signature = compute_test_signature(SECRET, &payload);

        let result = handler.handle(ProcessWebhookCommand { payload, signature }).await;

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn credit_checkout_grants_credits() {
        let (handler, store) = handler();

        let result = handler.handle(signed_command(credit_checkout_event())).await.unwrap();

        let ProcessWebhookResult::CreditsGranted { amount, balance, .. } = result else {
            panic!("expected CreditsGranted, got {:?}", result);
        };
        assert_eq!(amount, 100);
        assert_eq!(balance, 100);
        assert_eq!(store.credit_balance("user-1").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn redelivered_checkout_grants_once() {
        let (handler, store) = handler();

        handler.handle(signed_command(credit_checkout_event())).await.unwrap();
        handler.handle(signed_command(credit_checkout_event())).await.unwrap();

        assert_eq!(store.credit_balance("user-1").await.unwrap(), 100);
        assert_eq!(store.ledger_count(), 1);
    }

    #[tokio::test]
    async fn checkout_without_user_id_fails() {
        let (handler, store) = handler();
        let event = json!({
            "id": "evt_2",
            "eventType": "checkout.completed",
            "created_at": 1704067200,
            "object": {
                "id": "ch_2",
                "customer": {"id": "cus_2"}
            }
        });

        let result = handler.handle(signed_command(event)).await;

        assert!(matches!(
            result,
            Err(WebhookError::MissingMetadata("user_id"))
        ));
        assert_eq!(store.customer_count(), 0);
    }

    #[tokio::test]
    async fn subscription_checkout_upserts_subscription() {
        let (handler, store) = handler();
        let event = json!({
            "id": "evt_3",
            "eventType": "checkout.completed",
            "created_at": 1704067200,
            "object": {
                "id": "ch_3",
                "customer": {"id": "cus_3"},
                "metadata": {"user_id": "user-3", "product_type": "subscription"},
                "subscription": {
                    "id": "sub_3",
                    "status": "active",
                    "product": "prod_3"
                }
            }
        });

        let result = handler.handle(signed_command(event)).await.unwrap();

        assert!(matches!(
            result,
            ProcessWebhookResult::SubscriptionSynced { status: "active", .. }
        ));
        assert_eq!(store.subscription_count(), 1);
        let summary = store.active_subscription("user-3").await.unwrap().unwrap();
        assert_eq!(summary.creem_subscription_id, "sub_3");
    }

    #[tokio::test]
    async fn plain_checkout_syncs_customer_only() {
        let (handler, store) = handler();
        let event = json!({
            "id": "evt_4",
            "eventType": "checkout.completed",
            "created_at": 1704067200,
            "object": {
                "id": "ch_4",
                "customer": {"id": "cus_4"},
                "metadata": {"user_id": "user-4"}
            }
        });

        let result = handler.handle(signed_command(event)).await.unwrap();

        assert!(matches!(result, ProcessWebhookResult::CustomerSynced { .. }));
        assert_eq!(store.customer_count(), 1);
        assert_eq!(store.ledger_count(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Event Tests
    // ══════════════════════════════════════════════════════════════

    fn subscription_event(event_type: &str, status: &str) -> serde_json::Value {
        json!({
            "id": "evt_sub",
            "eventType": event_type,
            "created_at": 1704067200,
            "object": {
                "id": "sub_9",
                "status": status,
                "customer": {"id": "cus_9", "email": "ada@example.com"},
                "product": {"id": "prod_9"},
                "metadata": {"user_id": "user-9"}
            }
        })
    }

    #[tokio::test]
    async fn subscription_active_creates_records() {
        let (handler, store) = handler();

        let result = handler
            .handle(signed_command(subscription_event("subscription.active", "active")))
            .await
            .unwrap();

        assert!(matches!(
            result,
            ProcessWebhookResult::SubscriptionSynced { status: "active", .. }
        ));
        assert_eq!(store.customer_count(), 1);
        assert_eq!(store.subscription_count(), 1);
    }

    #[tokio::test]
    async fn subscription_canceled_updates_in_place() {
        let (handler, store) = handler();

        handler
            .handle(signed_command(subscription_event("subscription.active", "active")))
            .await
            .unwrap();
        handler
            .handle(signed_command(subscription_event("subscription.canceled", "canceled")))
            .await
            .unwrap();

        assert_eq!(store.subscription_count(), 1);
        assert!(store.active_subscription("user-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscription_without_user_id_fails() {
        let (handler, _) = handler();
        let event = json!({
            "id": "evt_sub",
            "eventType": "subscription.paid",
            "created_at": 1704067200,
            "object": {
                "id": "sub_9",
                "status": "paid",
                "customer": "cus_9"
            }
        });

        let result = handler.handle(signed_command(event)).await;

        assert!(matches!(
            result,
            Err(WebhookError::MissingMetadata("user_id"))
        ));
    }

    #[tokio::test]
    async fn subscription_without_customer_fails() {
        let (handler, _) = handler();
        let event = json!({
            "id": "evt_sub",
            "eventType": "subscription.trialing",
            "created_at": 1704067200,
            "object": {
                "id": "sub_9",
                "status": "trialing",
                "metadata": {"user_id": "user-9"}
            }
        });

        let result = handler.handle(signed_command(event)).await;

        assert!(matches!(result, Err(WebhookError::MissingField("customer"))));
    }

    // ══════════════════════════════════════════════════════════════
    // Unknown Event Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_event_acknowledged_without_side_effects() {
        let (handler, store) = handler();
        let event = json!({
            "id": "evt_u",
            "eventType": "refund.created",
            "created_at": 1704067200,
            "object": {"id": "ref_1"}
        });

        let result = handler.handle(signed_command(event)).await.unwrap();

        let ProcessWebhookResult::Ignored { event_type } = result else {
            panic!("expected Ignored");
        };
        assert_eq!(event_type, "refund.created");
        assert_eq!(store.customer_count(), 0);
        assert_eq!(store.ledger_count(), 0);
    }
}
