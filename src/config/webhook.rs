//! Webhook configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Webhook configuration (Creem)
///
/// Carries the shared signing secret used to authenticate inbound webhook
/// deliveries. The secret is passed explicitly into the verifier at startup;
/// nothing in the processing core reads the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    /// Creem webhook signing secret.
    ///
    /// The dashboard shows it with a `whsec_` prefix; the verifier accepts
    /// the value with or without that prefix.
    pub creem_webhook_secret: String,
}

impl WebhookConfig {
    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.creem_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("CREEM_WEBHOOK_SECRET"));
        }
        Ok(())
    }
}
