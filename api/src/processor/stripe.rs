use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{is_valid_session_id, CheckoutRequest, CheckoutSession, PaymentProcessor};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub secret_key: String,
    pub base_url: String,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    settings: Settings,
    client: reqwest::Client,
}

impl StripeClient {
    pub fn new(client: reqwest::Client, settings: Settings) -> Self {
        Self { client, settings }
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v1/checkout/sessions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    async fn parse_session(res: reqwest::Response) -> Result<CheckoutSession> {
        let status = res.status();
        let body = res.text().await.context("Stripe: unreadable response")?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            return Err(anyhow::anyhow!("Stripe returned {}: {}", status, message));
        }

        Ok(serde_json::from_str::<CheckoutSession>(&body)?)
    }
}

/// Stripe takes nested parameters in bracket form, e.g. `line_items[0][quantity]`.
pub fn form_params(request: &CheckoutRequest, currency: &str) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            currency.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.unit_amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.product_name.clone(),
        ),
    ];

    params.extend(
        request
            .metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );

    params
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let params = form_params(&request, &self.settings.currency);
        tracing::info!(
            "Creating checkout session for {} ({} minor units)",
            request.customer_email,
            request.unit_amount
        );

        let res = self
            .client
            .post(self.sessions_url())
            .bearer_auth(&self.settings.secret_key)
            .form(&params)
            .send()
            .await?;

        Self::parse_session(res).await
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        if !is_valid_session_id(session_id) {
            anyhow::bail!("Invalid checkout session id: {:?}", session_id);
        }
        let url = format!("{}/{}", self.sessions_url(), session_id);
        tracing::info!("Retrieving checkout session {}", session_id);

        let res = self
            .client
            .get(url)
            .bearer_auth(&self.settings.secret_key)
            .send()
            .await?;

        Self::parse_session(res).await
    }
}
