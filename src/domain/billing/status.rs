//! Subscription status enum.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a Creem subscription.
///
/// The five subscription event types differ only in the status they carry;
/// the payload's own `status` field is authoritative and is what gets stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    Paid,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    /// Parse a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "trialing" => Some(Self::Trialing),
            "paid" => Some(Self::Paid),
            "canceled" => Some(Self::Canceled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// The string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::Paid => "paid",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }
}
