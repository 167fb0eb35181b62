use std::collections::BTreeSet;

use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{QueryBuilder, Sqlite};

use super::push_in_list;
use crate::{
    clubs::{memberships::ClubMembership, Club, CLUB_COLUMNS},
    error::{AppError, AppResult, OrInternal},
    events::{registrations::EventRegistration, Event, EVENT_COLUMNS},
    payments::Payment,
    users::User,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct MemberParams {
    #[serde(rename = "userEmail")]
    user_email: Option<String>,
    role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingEvent {
    pub title: String,
    pub date: chrono::DateTime<Utc>,
    pub location: Option<String>,
    pub club_name: String,
}

/// Summary of the clubs a member reaches through their event registrations.
#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn member_overview(
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> AppResult<Json<Value>> {
    let db = &state.db;
    let failed = "Server error";

    let (Some(user_email), Some(role)) = (
        params.user_email.filter(|v| !v.is_empty()),
        params.role.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::bad_request("Missing userEmail or role"));
    };

    if User::with_role(&user_email, &role, db)
        .await
        .or_internal(failed)?
        .is_none()
    {
        return Err(AppError::forbidden("Unauthorized or user not found"));
    }

    let registrations = EventRegistration::for_user(&user_email, db)
        .await
        .or_internal(failed)?;
    let club_ids: Vec<String> = registrations
        .iter()
        .filter_map(|registration| registration.club_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let (clubs, events) = if club_ids.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE "));
        push_in_list(&mut query, "id", &club_ids);
        let clubs = query
            .build_query_as::<Club>()
            .fetch_all(db)
            .await
            .or_internal(failed)?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE datetime(event_date) >= datetime("
        ));
        query.push_bind(Utc::now()).push(") AND ");
        push_in_list(&mut query, "club_id", &club_ids);
        query.push(" ORDER BY datetime(event_date) ASC");
        let events = query
            .build_query_as::<Event>()
            .fetch_all(db)
            .await
            .or_internal(failed)?;

        (clubs, events)
    };

    let upcoming_events: Vec<UpcomingEvent> = events
        .into_iter()
        .map(|event| UpcomingEvent {
            club_name: clubs
                .iter()
                .find(|club| club.id == event.club_id)
                .map(|club| club.name.clone())
                .unwrap_or_default(),
            title: event.title,
            date: event.event_date,
            location: event.location,
        })
        .collect();

    Ok(Json(json!({
        "totalClubsJoined": clubs.len(),
        "totalEventsRegistered": registrations.len(),
        "upcomingEvents": upcoming_events,
    })))
}

fn require_user_email(params: MemberParams) -> AppResult<String> {
    params
        .user_email
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request("userEmail is required"))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_member_clubs(
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> AppResult<Json<Vec<ClubMembership>>> {
    let user_email = require_user_email(params)?;
    let memberships = ClubMembership::for_user(&user_email, &state.db)
        .await
        .or_internal("Server error")?;
    Ok(Json(memberships))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_member_events(
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> AppResult<Json<Vec<EventRegistration>>> {
    let user_email = require_user_email(params)?;
    let registrations = EventRegistration::for_user(&user_email, &state.db)
        .await
        .or_internal("Server error")?;
    Ok(Json(registrations))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_member_payments(
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> AppResult<Json<Vec<Payment>>> {
    let user_email = require_user_email(params)?;
    let payments = Payment::for_user(&user_email, &state.db)
        .await
        .or_internal("Server error")?;
    Ok(Json(payments))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clubs::test::{club_params, create_club},
        events::test::{create_event, event_params},
        tests::create_test_context,
        users::{test::create_user, Role},
    };
    use axum::http::StatusCode;
    use tracing_test::traced_test;

    async fn register(server: &axum_test::TestServer, event_id: &str, club_id: &str) {
        server
            .post("/event-registrations")
            .json(&json!({ "eventId": event_id, "userEmail": "a@x.com", "clubId": club_id }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_member_overview_gates() {
        let ctx = create_test_context().await;

        let response = ctx
            .server
            .get("/member-overview")
            .add_query_param("userEmail", "a@x.com")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        create_user(&ctx.server, "a@x.com", Role::Member).await;
        let response = ctx
            .server
            .get("/member-overview")
            .add_query_param("userEmail", "a@x.com")
            .add_query_param("role", "admin")
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_member_overview() {
        let ctx = create_test_context().await;
        create_user(&ctx.server, "a@x.com", Role::Member).await;
        let chess = create_club(&ctx.server, club_params("Chess Club", "m@x.com")).await;
        let jazz = create_club(&ctx.server, club_params("Jazz Club", "m@x.com")).await;

        let blitz = create_event(&ctx.server, event_params(&chess.id, "Blitz", 3)).await;
        let past = create_event(&ctx.server, event_params(&jazz.id, "Old Gig", -3)).await;
        create_event(&ctx.server, event_params(&chess.id, "Rapid", 6)).await;
        register(&ctx.server, &blitz, &chess.id).await;
        register(&ctx.server, &past, &jazz.id).await;

        let body: Value = ctx
            .server
            .get("/member-overview")
            .add_query_param("userEmail", "a@x.com")
            .add_query_param("role", "member")
            .await
            .json();
        assert_eq!(body["totalClubsJoined"], 2);
        assert_eq!(body["totalEventsRegistered"], 2);

        let upcoming = body["upcomingEvents"].as_array().unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0]["title"], "Blitz");
        assert_eq!(upcoming[0]["clubName"], "Chess Club");
        assert_eq!(upcoming[1]["title"], "Rapid");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_member_overview_without_registrations() {
        let ctx = create_test_context().await;
        create_user(&ctx.server, "a@x.com", Role::Member).await;

        let body: Value = ctx
            .server
            .get("/member-overview")
            .add_query_param("userEmail", "a@x.com")
            .add_query_param("role", "member")
            .await
            .json();
        assert_eq!(body["totalClubsJoined"], 0);
        assert_eq!(body["upcomingEvents"], json!([]));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_member_lists() {
        let ctx = create_test_context().await;
        register(&ctx.server, "E1", "C1").await;
        crate::clubs::memberships::test::membership("a@x.com", "C1", "m@x.com")
            .insert_if_absent(&ctx.db)
            .await
            .unwrap();

        for path in ["/member/my-clubs", "/member/my-events", "/member/my-payments"] {
            let response = ctx.server.get(path).await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }

        let clubs: Vec<ClubMembership> = ctx
            .server
            .get("/member/my-clubs")
            .add_query_param("userEmail", "a@x.com")
            .await
            .json();
        assert_eq!(clubs.len(), 1);

        let events: Vec<EventRegistration> = ctx
            .server
            .get("/member/my-events")
            .add_query_param("userEmail", "a@x.com")
            .await
            .json();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "E1");

        let payments: Vec<Payment> = ctx
            .server
            .get("/member/my-payments")
            .add_query_param("userEmail", "a@x.com")
            .await
            .json();
        assert!(payments.is_empty());
    }
}
