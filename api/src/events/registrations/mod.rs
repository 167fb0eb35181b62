mod registration;

pub use registration::*;

use crate::{
    error::{AppError, AppJson, AppResult, OrInternal},
    users::User,
};
use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParams {
    pub event_id: Option<String>,
    pub user_email: Option<String>,
    pub club_id: Option<String>,
}

/// Free-event registration. The pre-check gives the usual 409; the conditional
/// insert catches a concurrent duplicate that slips past it.
#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn register_for_event(
    State(state): State<AppState>,
    AppJson(params): AppJson<RegisterParams>,
) -> AppResult<Json<Value>> {
    let (Some(event_id), Some(user_email)) = (
        params.event_id.filter(|v| !v.is_empty()),
        params.user_email.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    let already_registered = || AppError::conflict("Already registered for this event");

    if EventRegistration::exists(&event_id, &user_email, &state.db)
        .await
        .or_internal("Internal server error")?
    {
        return Err(already_registered());
    }

    let registration = EventRegistration::new(event_id, user_email, params.club_id, None);
    if !registration
        .insert_if_absent(&state.db)
        .await
        .or_internal("Internal server error")?
    {
        return Err(already_registered());
    }

    Ok(Json(json!({
        "success": true,
        "message": "Event registered successfully!",
        "registrationId": registration.id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ManagerRoleParams {
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
    role: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_event_registrations(
    State(state): State<AppState>,
    Query(params): Query<ManagerRoleParams>,
) -> AppResult<Json<Vec<EventRegistration>>> {
    let (Some(manager_email), Some(role)) = (
        params.manager_email.filter(|v| !v.is_empty()),
        params.role.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::bad_request("managerEmail and role are required"));
    };

    // The role comes from the query string, not from the verified caller.
    if User::with_role(&manager_email, &role, &state.db)
        .await
        .or_internal("Failed to fetch registrations")?
        .is_none()
    {
        return Err(AppError::forbidden("Access denied. Not a manager."));
    }

    let registrations = sqlx::query_as::<_, EventRegistration>(&format!(
        "SELECT {REGISTRATION_COLUMNS} FROM event_registrations ORDER BY registered_at DESC"
    ))
    .fetch_all(&state.db)
    .await
    .or_internal("Failed to fetch registrations")?;

    Ok(Json(registrations))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tests::create_test_context;
    use crate::users::{test::create_user, Role};
    use axum::http::StatusCode;
    use tracing_test::traced_test;

    fn params(event_id: &str, user_email: &str) -> RegisterParams {
        RegisterParams {
            event_id: Some(event_id.to_string()),
            user_email: Some(user_email.to_string()),
            club_id: Some("C1".to_string()),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_register_twice_conflicts() {
        let ctx = create_test_context().await;

        let response = ctx
            .server
            .post("/event-registrations")
            .json(&params("E1", "a@x.com"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Event registered successfully!");

        let response = ctx
            .server
            .post("/event-registrations")
            .json(&params("E1", "a@x.com"))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["success"], false);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations")
            .fetch_one(&ctx.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_register_missing_fields() {
        let ctx = create_test_context().await;
        let response = ctx
            .server
            .post("/event-registrations")
            .json(&json!({ "eventId": "E1" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Missing required fields");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_list_registrations_requires_manager() {
        let ctx = create_test_context().await;
        create_user(&ctx.server, "boss@x.com", Role::ClubManager).await;
        ctx.server
            .post("/event-registrations")
            .json(&params("E1", "a@x.com"))
            .await
            .assert_status_ok();

        let response = ctx.server.get("/event-registrations").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = ctx
            .server
            .get("/event-registrations")
            .add_query_param("managerEmail", "boss@x.com")
            .add_query_param("role", "admin")
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = ctx
            .server
            .get("/event-registrations")
            .add_query_param("managerEmail", "boss@x.com")
            .add_query_param("role", "clubManager")
            .await;
        response.assert_status_ok();
        let registrations: Vec<EventRegistration> = response.json();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].status, REGISTERED);
    }
}
