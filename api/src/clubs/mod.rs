mod club;
pub mod memberships;

pub use club::*;

use crate::error::{AppError, AppJson, AppResult, OrInternal};
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Sqlite};

use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct FindClubParams {
    category: Option<String>,
    location: Option<String>,
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_clubs(
    State(state): State<AppState>,
    Query(params): Query<FindClubParams>,
) -> AppResult<Json<Vec<Club>>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE 1 = 1"));
    if let Some(category) = params.category.filter(|v| !v.is_empty()) {
        query.push(" AND category = ").push_bind(category);
    }
    if let Some(location) = params.location.filter(|v| !v.is_empty()) {
        query.push(" AND location = ").push_bind(location);
    }
    if let Some(manager_email) = params.manager_email.filter(|v| !v.is_empty()) {
        query.push(" AND manager_email = ").push_bind(manager_email);
    }
    query.push(" ORDER BY created_at DESC");
    tracing::debug!("Query: {}", query.sql());

    let clubs = query
        .build_query_as::<Club>()
        .fetch_all(&state.db)
        .await
        .or_internal("Failed to fetch clubs")?;

    Ok(Json(clubs))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_club_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let club = Club::from_id(&id, &state.db)
        .await
        .or_internal("Server error")?
        .ok_or_else(|| AppError::not_found("Club not found"))?;

    Ok(Json(json!({ "success": true, "data": club })))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClubParams {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub banner_image: Option<String>,
    pub membership_fee: Option<f64>,
    pub manager_email: Option<String>,
    pub status: Option<ClubStatus>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn create_club(
    State(state): State<AppState>,
    AppJson(params): AppJson<CreateClubParams>,
) -> AppResult<Json<Value>> {
    let club = Club {
        id: uuid::Uuid::new_v4().to_string(),
        name: params.name,
        description: params.description,
        category: params.category,
        location: params.location,
        banner_image: params.banner_image,
        membership_fee: params.membership_fee,
        manager_email: params.manager_email,
        status: params.status.unwrap_or_default(),
        created_at: Utc::now(),
    };
    club.insert(&state.db)
        .await
        .or_internal("Failed to create club")?;

    Ok(Json(json!({
        "success": true,
        "message": "Club created successfully",
        "clubId": club.id,
        "data": club,
    })))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateClubStatusParams {
    status: Option<String>,
}

/// Admin review of a club: pending, approved or rejected.
#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn update_club_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(params): AppJson<UpdateClubStatusParams>,
) -> AppResult<Json<Value>> {
    let status = params
        .status
        .as_deref()
        .filter(|status| !status.is_empty())
        .ok_or_else(|| AppError::bad_request("Status is required"))?
        .parse::<ClubStatus>()
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let result = sqlx::query("UPDATE clubs SET status = ? WHERE id = ?")
        .bind(status)
        .bind(&id)
        .execute(&state.db)
        .await
        .or_internal("Failed to update club status")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Club not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Club status updated successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ManagerParams {
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_my_clubs(
    State(state): State<AppState>,
    Query(params): Query<ManagerParams>,
) -> AppResult<Json<Value>> {
    let manager_email = params
        .manager_email
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request("managerEmail is required"))?;

    let clubs = Club::managed_by(&manager_email, &state.db)
        .await
        .or_internal("Failed to fetch clubs")?;

    Ok(Json(json!({ "success": true, "data": clubs })))
}
