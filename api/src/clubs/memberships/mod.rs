mod membership;

pub use membership::*;

use crate::{
    dates::parse_instant,
    error::{AppError, AppJson, AppResult, OrInternal},
};
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClubMembersParams {
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
    role: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_club_members(
    State(state): State<AppState>,
    Query(params): Query<ClubMembersParams>,
) -> AppResult<Json<Value>> {
    let (Some(manager_email), Some(_role)) = (
        params.manager_email.filter(|v| !v.is_empty()),
        params.role.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::bad_request("managerEmail and role are required"));
    };

    let memberships = ClubMembership::for_manager(&manager_email, &state.db)
        .await
        .or_internal("Server error")?;

    Ok(Json(json!({ "success": true, "data": memberships })))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExpireParams {
    #[serde(rename = "expireDate")]
    expire_date: Option<String>,
}

/// Stores a new expiry date and recomputes the status against the current time.
#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn expire_membership(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(params): AppJson<ExpireParams>,
) -> AppResult<Json<Value>> {
    let raw = params
        .expire_date
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request("expireDate is required"))?;
    let expire_date = parse_instant(&raw)
        .ok_or_else(|| AppError::bad_request(format!("Invalid expireDate: {raw}")))?;
    let status = MembershipStatus::at(expire_date, Utc::now());

    let result = sqlx::query("UPDATE club_memberships SET expire_date = ?, status = ? WHERE id = ?")
        .bind(expire_date)
        .bind(status)
        .bind(&id)
        .execute(&state.db)
        .await
        .or_internal("Server error")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Member not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Membership expiration updated",
        "status": status,
    })))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn delete_membership(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM club_memberships WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await
        .or_internal("Server error")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Member not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Membership deleted successfully",
    })))
}
