mod user;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
pub use user::*;

use crate::{
    auth::Caller,
    error::{AppError, AppJson, AppResult, OrInternal},
};
use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};

use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserParams {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Option<Role>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(params): AppJson<CreateUserParams>,
) -> AppResult<Json<Value>> {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: params.email,
        name: params.name,
        photo_url: params.photo_url,
        role: params.role.unwrap_or_default(),
        created_at: Utc::now(),
    };

    if !user.insert_if_absent(&state.db).await.or_internal("Internal server error")? {
        let existing = User::from_email(&user.email, &state.db)
            .await
            .or_internal("Internal server error")?;
        return Ok(Json(json!({
            "success": true,
            "message": "User already exists",
            "user": existing,
        })));
    }

    Ok(Json(json!({
        "success": true,
        "message": "User created successfully",
        "userId": user.id,
    })))
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, name, photo_url, role, created_at
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(&state.db)
    .await
    .or_internal("Failed to fetch users")?;

    Ok(Json(users))
}

/// Unknown emails are registered on the spot as members.
#[debug_handler]
#[tracing::instrument(skip(state, caller), fields(caller = %caller.0.email))]
pub async fn get_user_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(email): Path<String>,
) -> AppResult<Json<Value>> {
    if let Some(user) = User::from_email(&email, &state.db)
        .await
        .or_internal("Internal server error")?
    {
        return Ok(Json(json!({ "role": user.role })));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: email.split('@').next().map(str::to_string),
        email,
        photo_url: None,
        role: Role::Member,
        created_at: Utc::now(),
    };
    user.insert_if_absent(&state.db)
        .await
        .or_internal("Internal server error")?;
    tracing::info!("Created member {} on first role lookup", user.email);

    Ok(Json(json!({ "role": Role::Member })))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateRoleParams {
    pub role: Option<String>,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(params): AppJson<UpdateRoleParams>,
) -> AppResult<Json<Value>> {
    let role: Role = params
        .role
        .as_deref()
        .filter(|role| !role.is_empty())
        .ok_or_else(|| AppError::bad_request("Role is required"))?
        .parse::<Role>()
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(&id)
        .execute(&state.db)
        .await
        .or_internal("Failed to update user role")?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }

    Ok(Json(json!({
        "success": true,
        "message": "User role updated successfully",
    })))
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::tests::create_test_server;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use tracing_test::traced_test;

    pub async fn create_user(server: &TestServer, email: &str, role: Role) -> String {
        let response = server
            .post("/users")
            .json(&CreateUserParams {
                email: email.to_string(),
                name: Some("Test User".to_string()),
                photo_url: None,
                role: Some(role),
            })
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["userId"].as_str().unwrap().to_string()
    }

    pub async fn create_test_user(server: &TestServer) -> String {
        create_user(server, "test@example.com", Role::Member).await
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_user() {
        let server = create_test_server().await;
        create_test_user(&server).await;

        let response = server.get("/users").await;
        response.assert_status_ok();
        let users: Vec<User> = response.json();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "test@example.com");
        assert_eq!(users[0].role, Role::Member);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_existing_user() {
        let server = create_test_server().await;
        let id = create_test_user(&server).await;

        let response = server
            .post("/users")
            .json(&json!({ "email": "test@example.com", "role": "admin" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "User already exists");
        assert_eq!(body["user"]["id"], id);
        // the existing record is untouched
        assert_eq!(body["user"]["role"], "member");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_role_lookup_creates_member() {
        let server = create_test_server().await;

        let response = server
            .get("/users/new@x.com/role")
            .add_header(
                HeaderName::from_static("x-user-email"),
                HeaderValue::from_static("new@x.com"),
            )
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({ "role": "member" }));

        let users: Vec<User> = server.get("/users").await.json();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "new@x.com");
        assert_eq!(users[0].name.as_deref(), Some("new"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_role_lookup_existing() {
        let server = create_test_server().await;
        create_user(&server, "boss@x.com", Role::ClubManager).await;

        let response = server.get("/users/boss@x.com/role").await;
        response.assert_json(&json!({ "role": "clubManager" }));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_update_role() {
        let server = create_test_server().await;
        let id = create_test_user(&server).await;

        let response = server
            .patch(&format!("/users/{}/role", id))
            .json(&json!({ "role": "admin" }))
            .await;
        response.assert_status_ok();

        let response = server.get("/users/test@example.com/role").await;
        response.assert_json(&json!({ "role": "admin" }));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_create_user_malformed_body() {
        let server = create_test_server().await;

        let response = server.post("/users").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("email"));

        let response = server
            .post("/users")
            .json(&json!({ "email": "a@x.com", "role": "overlord" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.post("/users").text("not json").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);

        let users: Vec<User> = server.get("/users").await.json();
        assert!(users.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_update_role_validation() {
        let server = create_test_server().await;
        let id = create_test_user(&server).await;

        let response = server
            .patch(&format!("/users/{}/role", id))
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Role is required");

        let response = server
            .patch(&format!("/users/{}/role", id))
            .json(&json!({ "role": "overlord" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .patch("/users/missing/role")
            .json(&json!({ "role": "admin" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
