mod member;

pub use member::*;

use crate::{
    auth::Caller,
    clubs::Club,
    error::{AppError, AppResult, OrInternal},
    processor::PAID,
    users::{Role, User},
};
use axum::{
    debug_handler,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::AppState;

/// Appends `<column> IN (?, ?, ...)`. Callers must not pass an empty list.
pub(crate) fn push_in_list(query: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &[String]) {
    query.push(format!("{column} IN ("));
    let mut separated = query.separated(", ");
    for value in values {
        separated.push_bind(value.clone());
    }
    separated.push_unseparated(")");
}

async fn count(db: &SqlitePool, sql: &str) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(sql).fetch_one(db).await?;
    Ok(count)
}

async fn count_clubs_with_status(db: &SqlitePool, status: &str) -> Result<i64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clubs WHERE status = ?")
        .bind(status)
        .fetch_one(db)
        .await?;
    Ok(count)
}

#[derive(Debug, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubMembershipCount {
    pub club_name: String,
    pub memberships: i64,
}

#[debug_handler]
#[tracing::instrument(skip(state))]
pub async fn admin_overview(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let db = &state.db;
    let failed = "Server Error";

    let users = count(db, "SELECT COUNT(*) FROM users").await.or_internal(failed)?;
    let clubs = count(db, "SELECT COUNT(*) FROM clubs").await.or_internal(failed)?;
    let pending = count_clubs_with_status(db, "pending").await.or_internal(failed)?;
    let approved = count_clubs_with_status(db, "approved").await.or_internal(failed)?;
    let rejected = count_clubs_with_status(db, "rejected").await.or_internal(failed)?;
    let memberships = count(db, "SELECT COUNT(*) FROM club_memberships")
        .await
        .or_internal(failed)?;
    let events = count(db, "SELECT COUNT(*) FROM events").await.or_internal(failed)?;
    let registrations = count(db, "SELECT COUNT(*) FROM event_registrations")
        .await
        .or_internal(failed)?;

    let (total_payments, total_amount) =
        sqlx::query_as::<_, (i64, f64)>("SELECT COUNT(*), TOTAL(amount) FROM payments")
            .fetch_one(db)
            .await
            .or_internal(failed)?;

    let memberships_per_club = sqlx::query_as::<_, ClubMembershipCount>(
        r#"
        SELECT c.name AS club_name, COUNT(m.id) AS memberships
        FROM clubs c
        LEFT JOIN club_memberships m ON m.club_id = c.id
        GROUP BY c.id
        ORDER BY c.created_at
        "#,
    )
    .fetch_all(db)
    .await
    .or_internal(failed)?;

    Ok(Json(json!({
        "users": { "total": users },
        "clubs": {
            "total": clubs,
            "pending": pending,
            "approved": approved,
            "rejected": rejected,
        },
        "memberships": { "total": memberships },
        "membershipsPerClub": memberships_per_club,
        "events": { "total": events },
        "eventRegistrations": { "total": registrations },
        "payments": {
            "totalPayments": total_payments,
            "totalAmount": total_amount,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ManagerOverviewParams {
    #[serde(rename = "managerEmail")]
    manager_email: Option<String>,
    role: Option<String>,
}

/// Totals across every club the manager owns. `role`, when given, narrows the
/// member count to members whose stored user role matches.
#[debug_handler]
#[tracing::instrument(skip(state, caller), fields(caller = %caller.0.email))]
pub async fn club_manager_overview(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ManagerOverviewParams>,
) -> AppResult<Json<Value>> {
    let db = &state.db;
    let failed = "Server Error";

    let manager_email = params
        .manager_email
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request("managerEmail is required"))?;
    let filter_role = params.role.filter(|v| !v.is_empty());

    let clubs = Club::managed_by(&manager_email, db).await.or_internal(failed)?;
    if clubs.is_empty() {
        return Err(AppError::not_found("No clubs found for this manager"));
    }

    let manager = User::from_email(&manager_email, db)
        .await
        .or_internal(failed)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if manager.role != Role::ClubManager {
        return Err(AppError::forbidden("User is not a club manager")
            .with_field("foundRole", manager.role.as_str()));
    }

    let club_ids: Vec<String> = clubs.iter().map(|club| club.id.clone()).collect();

    let mut members = match &filter_role {
        Some(role) => {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT COUNT(*) FROM users WHERE role = ",
            );
            query
                .push_bind(role.clone())
                .push(" AND email IN (SELECT user_email FROM club_memberships WHERE ");
            push_in_list(&mut query, "club_id", &club_ids);
            query.push(")");
            query
        }
        None => {
            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT COUNT(*) FROM club_memberships WHERE ");
            push_in_list(&mut query, "club_id", &club_ids);
            query
        }
    };
    let (total_members,) = members
        .build_query_as::<(i64,)>()
        .fetch_one(db)
        .await
        .or_internal(failed)?;

    let mut events: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM events WHERE ");
    push_in_list(&mut events, "club_id", &club_ids);
    let (total_events,) = events
        .build_query_as::<(i64,)>()
        .fetch_one(db)
        .await
        .or_internal(failed)?;

    let mut payments: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*), TOTAL(amount) FROM payments WHERE status = ");
    payments.push_bind(PAID).push(" AND ");
    push_in_list(&mut payments, "club_id", &club_ids);
    let (total_payments, total_amount) = payments
        .build_query_as::<(i64, f64)>()
        .fetch_one(db)
        .await
        .or_internal(failed)?;

    Ok(Json(json!({
        "manager": {
            "email": manager_email,
            "name": manager.name,
            "role": manager.role,
        },
        "clubs": { "total": clubs.len() },
        "members": {
            "total": total_members,
            "filterRole": filter_role.as_deref().unwrap_or("none"),
        },
        "events": { "total": total_events },
        "payments": {
            "totalPayments": total_payments,
            "totalAmount": total_amount,
        },
    })))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        clubs::{
            memberships::test::membership,
            test::{club_params, create_club},
        },
        payments::{Payment, PaymentType},
        tests::create_test_context,
        users::test::create_user,
    };
    use axum::http::StatusCode;
    use chrono::Utc;
    use tracing_test::traced_test;

    fn payment(session_id: &str, club_id: &str, amount: f64) -> Payment {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: session_id.to_string(),
            user_email: "a@x.com".to_string(),
            amount,
            payment_type: PaymentType::ClubMembership,
            club_id: Some(club_id.to_string()),
            event_id: None,
            event_title: None,
            category: None,
            status: PAID.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_admin_overview_empty() {
        let ctx = create_test_context().await;
        let body: Value = ctx.server.get("/admin-overview").await.json();
        assert_eq!(body["users"]["total"], 0);
        assert_eq!(body["clubs"]["total"], 0);
        assert_eq!(body["membershipsPerClub"], json!([]));
        assert_eq!(body["payments"]["totalPayments"], 0);
        assert_eq!(body["payments"]["totalAmount"], 0.0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_admin_overview() {
        let ctx = create_test_context().await;
        create_user(&ctx.server, "a@x.com", Role::Member).await;
        let chess = create_club(&ctx.server, club_params("Chess Club", "m@x.com")).await;
        let mut approved = club_params("Jazz Club", "m@x.com");
        approved.status = Some(crate::clubs::ClubStatus::Approved);
        create_club(&ctx.server, approved).await;

        membership("a@x.com", &chess.id, "m@x.com")
            .insert_if_absent(&ctx.db)
            .await
            .unwrap();
        payment("cs_1", &chess.id, 25.0).insert_if_absent(&ctx.db).await.unwrap();
        payment("cs_2", &chess.id, 12.5).insert_if_absent(&ctx.db).await.unwrap();

        let body: Value = ctx.server.get("/admin-overview").await.json();
        assert_eq!(body["users"]["total"], 1);
        assert_eq!(body["clubs"]["total"], 2);
        assert_eq!(body["clubs"]["pending"], 1);
        assert_eq!(body["clubs"]["approved"], 1);
        assert_eq!(body["clubs"]["rejected"], 0);
        assert_eq!(body["memberships"]["total"], 1);
        assert_eq!(
            body["membershipsPerClub"],
            json!([
                { "clubName": "Chess Club", "memberships": 1 },
                { "clubName": "Jazz Club", "memberships": 0 },
            ])
        );
        assert_eq!(body["payments"]["totalPayments"], 2);
        assert_eq!(body["payments"]["totalAmount"], 37.5);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_club_manager_overview_errors() {
        let ctx = create_test_context().await;

        let response = ctx.server.get("/club-manager-overview").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = ctx
            .server
            .get("/club-manager-overview")
            .add_query_param("managerEmail", "m@x.com")
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["message"], "No clubs found for this manager");

        create_club(&ctx.server, club_params("Chess Club", "m@x.com")).await;
        let response = ctx
            .server
            .get("/club-manager-overview")
            .add_query_param("managerEmail", "m@x.com")
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["message"], "User not found");

        create_user(&ctx.server, "m@x.com", Role::Member).await;
        let response = ctx
            .server
            .get("/club-manager-overview")
            .add_query_param("managerEmail", "m@x.com")
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["foundRole"], "member");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_club_manager_overview() {
        let ctx = create_test_context().await;
        create_user(&ctx.server, "m@x.com", Role::ClubManager).await;
        create_user(&ctx.server, "a@x.com", Role::Member).await;
        create_user(&ctx.server, "b@x.com", Role::Admin).await;
        let chess = create_club(&ctx.server, club_params("Chess Club", "m@x.com")).await;
        let other = create_club(&ctx.server, club_params("Other Club", "o@x.com")).await;

        for (user, club) in [("a@x.com", &chess), ("b@x.com", &chess), ("a@x.com", &other)] {
            membership(user, &club.id, "m@x.com")
                .insert_if_absent(&ctx.db)
                .await
                .unwrap();
        }
        payment("cs_1", &chess.id, 25.0).insert_if_absent(&ctx.db).await.unwrap();
        payment("cs_2", &other.id, 99.0).insert_if_absent(&ctx.db).await.unwrap();
        crate::events::test::create_event(
            &ctx.server,
            crate::events::test::event_params(&chess.id, "Blitz", 3),
        )
        .await;

        let body: Value = ctx
            .server
            .get("/club-manager-overview")
            .add_query_param("managerEmail", "m@x.com")
            .await
            .json();
        assert_eq!(body["manager"]["role"], "clubManager");
        assert_eq!(body["clubs"]["total"], 1);
        assert_eq!(body["members"]["total"], 2);
        assert_eq!(body["members"]["filterRole"], "none");
        assert_eq!(body["events"]["total"], 1);
        assert_eq!(body["payments"]["totalPayments"], 1);
        assert_eq!(body["payments"]["totalAmount"], 25.0);

        let body: Value = ctx
            .server
            .get("/club-manager-overview")
            .add_query_param("managerEmail", "m@x.com")
            .add_query_param("role", "member")
            .await
            .json();
        assert_eq!(body["members"]["total"], 1);
        assert_eq!(body["members"]["filterRole"], "member");
    }
}
