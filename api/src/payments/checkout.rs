use std::collections::BTreeMap;

use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::{
    error::{AppError, AppJson, AppResult, OrInternal},
    processor::{to_minor_units, CheckoutRequest, SESSION_ID_PLACEHOLDER},
    AppState,
};

use super::PaymentType;

const PENDING: &str = "pending";

#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCheckoutParams {
    /// Decimal currency units, as a number or a numeric string.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub amount: Option<f64>,
    pub event_title: Option<String>,
    pub user_email: Option<String>,
    pub event_id: Option<String>,
    pub club_id: Option<String>,
    pub payment_type: Option<String>,
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCheckoutParams {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub cost: Option<f64>,
    pub user_email: Option<String>,
    pub club_id: Option<String>,
    pub club_name: Option<String>,
    pub category: Option<String>,
    pub manager_email: Option<String>,
    pub banner_image: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn require_payer(user_email: Option<String>, amount: Option<f64>) -> AppResult<(String, f64)> {
    let (Some(user_email), Some(amount)) = (non_empty(user_email), amount) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::bad_request("Amount must be a positive number"));
    }
    Ok((user_email, amount))
}

/// Builds session metadata from the fields that are present, plus the pending marker.
fn metadata<'a>(fields: impl IntoIterator<Item = (&'a str, Option<String>)>) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = fields
        .into_iter()
        .filter_map(|(key, value)| non_empty(value).map(|value| (key.to_string(), value)))
        .collect();
    metadata.insert("status".to_string(), PENDING.to_string());
    metadata
}

async fn start_checkout(state: &AppState, request: CheckoutRequest) -> AppResult<Json<Value>> {
    let session = state
        .processor
        .create_checkout_session(request)
        .await
        .or_internal("Payment session creation failed")?;

    let url = session
        .url
        .ok_or_else(|| anyhow::anyhow!("Checkout session {} has no redirect URL", session.id))
        .or_internal("Payment session creation failed")?;

    Ok(Json(json!({ "success": true, "url": url })))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn create_event_checkout(
    State(state): State<AppState>,
    AppJson(params): AppJson<EventCheckoutParams>,
) -> AppResult<Json<Value>> {
    let (user_email, amount) = require_payer(params.user_email, params.amount)?;
    let event_title = non_empty(params.event_title);
    let domain = state.site.domain.trim_end_matches('/');

    let request = CheckoutRequest {
        customer_email: user_email.clone(),
        product_name: event_title.clone().unwrap_or_else(|| "Event registration".to_string()),
        unit_amount: to_minor_units(amount),
        metadata: metadata([
            ("userEmail", Some(user_email)),
            ("amount", Some(amount.to_string())),
            (
                "paymentType",
                Some(
                    non_empty(params.payment_type)
                        .unwrap_or_else(|| PaymentType::Event.as_str().to_string()),
                ),
            ),
            ("clubId", params.club_id),
            ("eventId", params.event_id),
            ("eventTitle", event_title),
        ]),
        success_url: format!("{domain}/payment-success?session_id={SESSION_ID_PLACEHOLDER}"),
        cancel_url: format!("{domain}/payment-cancelled"),
    };

    start_checkout(&state, request).await
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn create_membership_checkout(
    State(state): State<AppState>,
    AppJson(params): AppJson<MembershipCheckoutParams>,
) -> AppResult<Json<Value>> {
    let (user_email, cost) = require_payer(params.user_email, params.cost)?;
    let club_name = non_empty(params.club_name);
    let domain = state.site.domain.trim_end_matches('/');

    let request = CheckoutRequest {
        customer_email: user_email.clone(),
        product_name: format!("{} - Club Membership", club_name.as_deref().unwrap_or("Club")),
        unit_amount: to_minor_units(cost),
        metadata: metadata([
            ("userEmail", Some(user_email)),
            ("clubId", params.club_id),
            ("clubName", club_name),
            ("category", params.category),
            ("managerEmail", params.manager_email),
            ("cost", Some(cost.to_string())),
            (
                "paymentType",
                Some(PaymentType::ClubMembership.as_str().to_string()),
            ),
            ("bannerImage", params.banner_image),
            ("location", params.location),
            ("description", params.description),
        ]),
        success_url: format!(
            "{domain}/club-membership-payment-success?session_id={SESSION_ID_PLACEHOLDER}"
        ),
        cancel_url: format!("{domain}/club-membership-payment-cancelled"),
    };

    start_checkout(&state, request).await
}
