mod event;
pub mod registrations;

pub use event::*;

use crate::{
    dates::parse_instant,
    error::{AppError, AppJson, AppResult, OrInternal},
};
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Sqlite};

use crate::AppState;

fn parse_event_date(raw: &str) -> AppResult<DateTime<Utc>> {
    parse_instant(raw).ok_or_else(|| AppError::bad_request(format!("Invalid eventDate: {raw}")))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingEventParams {
    club_id: Option<String>,
    is_paid: Option<String>,
    location: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<UpcomingEventParams>,
) -> AppResult<Json<Vec<Event>>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE datetime(event_date) >= datetime("
    ));
    query.push_bind(Utc::now()).push(")");
    if let Some(club_id) = params.club_id.filter(|v| !v.is_empty()) {
        query.push(" AND club_id = ").push_bind(club_id);
    }
    // Any value other than the literal "true" selects free events.
    if let Some(is_paid) = params.is_paid.filter(|v| !v.is_empty()) {
        query.push(" AND is_paid = ").push_bind(is_paid == "true");
    }
    if let Some(location) = params.location.filter(|v| !v.is_empty()) {
        query.push(" AND location = ").push_bind(location);
    }
    query.push(" ORDER BY datetime(event_date) ASC");
    tracing::debug!("Query: {}", query.sql());

    let events = query
        .build_query_as::<Event>()
        .fetch_all(&state.db)
        .await
        .or_internal("Failed to fetch upcoming events")?;

    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct EventListParams {
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_events(
    State(state): State<AppState>,
    Query(params): Query<EventListParams>,
) -> AppResult<Json<Vec<Event>>> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
    if let Some(manager_email) = params.manager_email.filter(|v| !v.is_empty()) {
        query.push(" WHERE manager_email = ").push_bind(manager_email);
    }
    query.push(" ORDER BY created_at DESC");

    let events = query
        .build_query_as::<Event>()
        .fetch_all(&state.db)
        .await
        .or_internal("Failed to fetch events")?;

    Ok(Json(events))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventParams {
    pub club_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub location: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    pub event_fee: Option<f64>,
    pub max_attendees: Option<i64>,
    pub manager_email: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn create_event(
    State(state): State<AppState>,
    AppJson(params): AppJson<CreateEventParams>,
) -> AppResult<Json<Value>> {
    let event = Event {
        id: uuid::Uuid::new_v4().to_string(),
        club_id: params.club_id,
        title: params.title,
        description: params.description,
        event_date: parse_event_date(&params.event_date)?,
        location: params.location,
        is_paid: params.is_paid,
        event_fee: params.event_fee,
        max_attendees: params.max_attendees,
        manager_email: params.manager_email,
        created_at: Utc::now(),
    };
    event
        .insert(&state.db)
        .await
        .or_internal("Failed to create event")?;

    Ok(Json(json!({
        "success": true,
        "message": "Event created successfully",
        "eventId": event.id,
    })))
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventParams {
    pub club_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub location: Option<String>,
    pub is_paid: Option<bool>,
    pub event_fee: Option<f64>,
    pub max_attendees: Option<i64>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(params): AppJson<UpdateEventParams>,
) -> AppResult<Json<Value>> {
    let event_date = params
        .event_date
        .as_deref()
        .map(parse_event_date)
        .transpose()?;

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE events SET ");
    let mut separated = query.separated(", ");
    let mut fields = 0;
    if let Some(club_id) = params.club_id {
        separated.push("club_id = ");
        separated.push_bind_unseparated(club_id);
        fields += 1;
    }
    if let Some(title) = params.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
        fields += 1;
    }
    if let Some(description) = params.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
        fields += 1;
    }
    if let Some(event_date) = event_date {
        separated.push("event_date = ");
        separated.push_bind_unseparated(event_date);
        fields += 1;
    }
    if let Some(location) = params.location {
        separated.push("location = ");
        separated.push_bind_unseparated(location);
        fields += 1;
    }
    if let Some(is_paid) = params.is_paid {
        separated.push("is_paid = ");
        separated.push_bind_unseparated(is_paid);
        fields += 1;
    }
    if let Some(event_fee) = params.event_fee {
        separated.push("event_fee = ");
        separated.push_bind_unseparated(event_fee);
        fields += 1;
    }
    if let Some(max_attendees) = params.max_attendees {
        separated.push("max_attendees = ");
        separated.push_bind_unseparated(max_attendees);
        fields += 1;
    }

    if fields == 0 {
        return Err(AppError::bad_request("No fields to update"));
    }

    query.push(" WHERE id = ");
    query.push_bind(id);
    tracing::debug!("Query: {}", query.sql());

    let result = query
        .build()
        .execute(&state.db)
        .await
        .or_internal("Failed to update event")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Event updated successfully",
    })))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await
        .or_internal("Failed to delete event")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Event not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Event deleted successfully",
    })))
}
