pub mod stripe;

#[cfg(test)]
pub mod fake;

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::FromRef;
use serde::{Deserialize, Serialize};

use crate::AppState;

pub const PAID: &str = "paid";

/// Placeholder the processor substitutes with the real session id in redirect URLs.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// One purchase attempt, as sent to the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub product_name: String,
    /// Price in minor currency units.
    pub unit_amount: i64,
    pub metadata: BTreeMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAID
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require_metadata(&self, key: &str) -> Result<&str> {
        self.metadata(key)
            .ok_or_else(|| anyhow::anyhow!("Checkout session {} has no {} metadata", self.id, key))
    }
}

/// Hosted-checkout payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession>;
}

impl FromRef<AppState> for Arc<dyn PaymentProcessor> {
    fn from_ref(state: &AppState) -> Self {
        state.processor.clone()
    }
}

/// Session ids are opaque tokens like `cs_test_a1B2`. Anything else is
/// refused before it reaches a request path.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Converts decimal currency units to minor units.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
