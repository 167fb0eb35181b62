mod checkout;
mod confirm;
mod payment;

pub use checkout::*;
pub use confirm::*;
pub use payment::*;

use crate::{
    dates::parse_instant,
    error::{AppError, AppResult, OrInternal},
};
use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    user_email: Option<String>,
    club_id: Option<String>,
    event_id: Option<String>,
    status: Option<String>,
    payment_type: Option<String>,
    min_amount: Option<String>,
    max_amount: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

fn parse_amount(name: &str, raw: &str) -> AppResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| AppError::bad_request(format!("Invalid {name}: {raw}")))
}

fn parse_date(name: &str, raw: &str) -> AppResult<chrono::DateTime<chrono::Utc>> {
    parse_instant(raw).ok_or_else(|| AppError::bad_request(format!("Invalid {name}: {raw}")))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_payments(
    State(state): State<AppState>,
    Query(filter): Query<PaymentFilter>,
) -> AppResult<Json<Vec<Payment>>> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE 1 = 1"));
    if let Some(user_email) = present(filter.user_email) {
        query.push(" AND user_email = ").push_bind(user_email);
    }
    if let Some(club_id) = present(filter.club_id) {
        query.push(" AND club_id = ").push_bind(club_id);
    }
    if let Some(event_id) = present(filter.event_id) {
        query.push(" AND event_id = ").push_bind(event_id);
    }
    if let Some(status) = present(filter.status) {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(payment_type) = present(filter.payment_type) {
        query.push(" AND payment_type = ").push_bind(payment_type);
    }
    if let Some(min_amount) = present(filter.min_amount) {
        let min_amount = parse_amount("minAmount", &min_amount)?;
        query.push(" AND amount >= ").push_bind(min_amount);
    }
    if let Some(max_amount) = present(filter.max_amount) {
        let max_amount = parse_amount("maxAmount", &max_amount)?;
        query.push(" AND amount <= ").push_bind(max_amount);
    }
    if let Some(start_date) = present(filter.start_date) {
        let start_date = parse_date("startDate", &start_date)?;
        query
            .push(" AND datetime(created_at) >= datetime(")
            .push_bind(start_date)
            .push(")");
    }
    if let Some(end_date) = present(filter.end_date) {
        let end_date = parse_date("endDate", &end_date)?;
        query
            .push(" AND datetime(created_at) <= datetime(")
            .push_bind(end_date)
            .push(")");
    }
    query.push(" ORDER BY created_at DESC");
    tracing::debug!("Query: {}", query.sql());

    let payments = query
        .build_query_as::<Payment>()
        .fetch_all(&state.db)
        .await
        .or_internal("Failed to fetch payments")?;

    Ok(Json(payments))
}
