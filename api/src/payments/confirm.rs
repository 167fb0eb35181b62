//! Poll-on-redirect payment confirmation.
//!
//! The client calls back with the checkout session id after the processor
//! redirects it. A paid session produces one payment row and one downstream
//! row (a registration or a membership). Both writes are conditional inserts on
//! a natural key, so replaying the callback (refresh, back button, double
//! redirect) or racing two callbacks never creates a second row. There is no
//! transaction across the two tables: if the second write fails, the next
//! callback completes it.

use anyhow::{Context, Result};
use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    clubs::memberships::{ClubMembership, MembershipStatus},
    error::{AppError, AppResult, OrInternal},
    events::registrations::EventRegistration,
    processor::{is_valid_session_id, CheckoutSession, PAID},
    AppState,
};

use super::{Payment, PaymentType};

fn metadata_amount(session: &CheckoutSession, key: &str) -> Result<f64> {
    let raw = session.require_metadata(key)?;
    raw.parse::<f64>()
        .with_context(|| format!("Checkout session {} has a non-numeric {}: {}", session.id, key, raw))
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl Payment {
    pub fn from_event_session(session: &CheckoutSession) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: session.id.clone(),
            user_email: session.require_metadata("userEmail")?.to_string(),
            amount: metadata_amount(session, "amount")?,
            payment_type: PaymentType::Event,
            club_id: owned(session.metadata("clubId")),
            event_id: Some(session.require_metadata("eventId")?.to_string()),
            event_title: owned(session.metadata("eventTitle")),
            category: None,
            status: PAID.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn from_membership_session(session: &CheckoutSession) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: session.id.clone(),
            user_email: session.require_metadata("userEmail")?.to_string(),
            amount: metadata_amount(session, "cost")?,
            payment_type: PaymentType::ClubMembership,
            club_id: Some(session.require_metadata("clubId")?.to_string()),
            event_id: None,
            event_title: None,
            category: owned(session.metadata("category")),
            status: PAID.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Records a paid event checkout: the payment, then the registration.
pub async fn record_event_purchase(db: &SqlitePool, session: &CheckoutSession) -> Result<()> {
    let payment = Payment::from_event_session(session)?;
    let registration = EventRegistration::new(
        session.require_metadata("eventId")?.to_string(),
        payment.user_email.clone(),
        payment.club_id.clone(),
        Some(session.id.clone()),
    );

    if !payment.insert_if_absent(db).await? {
        tracing::info!("Payment for session {} already recorded", session.id);
    }
    if !registration.insert_if_absent(db).await? {
        tracing::info!(
            "{} already registered for event {}",
            registration.user_email,
            registration.event_id
        );
    }

    Ok(())
}

/// Records a paid membership checkout: the payment, then the membership.
pub async fn record_membership_purchase(db: &SqlitePool, session: &CheckoutSession) -> Result<()> {
    let payment = Payment::from_membership_session(session)?;
    let membership = ClubMembership {
        id: uuid::Uuid::new_v4().to_string(),
        user_email: payment.user_email.clone(),
        club_id: session.require_metadata("clubId")?.to_string(),
        club_name: Some(session.metadata("clubName").unwrap_or_default().to_string()),
        category: owned(session.metadata("category")),
        manager_email: owned(session.metadata("managerEmail")),
        banner_image: owned(session.metadata("bannerImage")),
        location: owned(session.metadata("location")),
        description: owned(session.metadata("description")),
        payment_id: Some(session.id.clone()),
        status: MembershipStatus::Active,
        joined_at: Utc::now(),
        expire_date: None,
    };

    if !payment.insert_if_absent(db).await? {
        tracing::info!("Payment for session {} already recorded", session.id);
    }
    if !membership.insert_if_absent(db).await? {
        tracing::info!(
            "{} already a member of club {}",
            membership.user_email,
            membership.club_id
        );
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SessionParams {
    session_id: Option<String>,
}

/// Fetches the session and rejects it unless the processor reports it paid.
async fn paid_session(state: &AppState, params: SessionParams) -> AppResult<CheckoutSession> {
    let session_id = params
        .session_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request("session_id is required"))?;
    if !is_valid_session_id(&session_id) {
        return Err(AppError::bad_request("Invalid session_id"));
    }

    let session = state
        .processor
        .retrieve_checkout_session(&session_id)
        .await
        .or_internal("Payment processing error")?;

    if !session.is_paid() {
        tracing::warn!(
            "Session {} confirmed with payment status {}",
            session.id,
            session.payment_status
        );
        return Err(AppError::bad_request("Payment not completed"));
    }

    Ok(session)
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn confirm_event_payment(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> AppResult<Json<Value>> {
    let session = paid_session(&state, params).await?;

    record_event_purchase(&state.db, &session)
        .await
        .or_internal("Payment processing error")?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment and registration processed successfully",
    })))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn confirm_membership_payment(
    State(state): State<AppState>,
    Query(params): Query<SessionParams>,
) -> AppResult<Json<Value>> {
    let session = paid_session(&state, params).await?;

    record_membership_purchase(&state.db, &session)
        .await
        .or_internal("Payment processing error")?;

    Ok(Json(json!({
        "success": true,
        "message": "Club membership payment saved successfully",
    })))
}
