use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

pub const REGISTERED: &str = "registered";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub id: String,
    pub event_id: String,
    pub user_email: String,
    pub club_id: Option<String>,
    pub status: String,
    pub payment_id: Option<String>,
    pub registered_at: DateTime<Utc>,
}

pub(crate) const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_email, club_id, status, payment_id, registered_at";

impl EventRegistration {
    pub fn new(
        event_id: String,
        user_email: String,
        club_id: Option<String>,
        payment_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id,
            user_email,
            club_id,
            status: REGISTERED.to_string(),
            payment_id,
            registered_at: Utc::now(),
        }
    }

    pub async fn exists(
        event_id: &str,
        user_email: &str,
        db: &SqlitePool,
    ) -> Result<bool, sqlx::Error> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT id FROM event_registrations WHERE event_id = ? AND user_email = ?",
        )
        .bind(event_id)
        .bind(user_email)
        .fetch_optional(db)
        .await?;

        Ok(found.is_some())
    }

    pub async fn for_user(user_email: &str, db: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let registrations = sqlx::query_as::<_, EventRegistration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE user_email = ? ORDER BY registered_at DESC"
        ))
        .bind(user_email)
        .fetch_all(db)
        .await?;

        Ok(registrations)
    }

    /// Single-statement insert keyed on (event_id, user_email). An existing
    /// registration is left untouched. Returns whether a row was written.
    pub async fn insert_if_absent(&self, db: &SqlitePool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_registrations (id, event_id, user_email, club_id, status,
                                             payment_id, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (event_id, user_email) DO NOTHING
            "#,
        )
        .bind(&self.id)
        .bind(&self.event_id)
        .bind(&self.user_email)
        .bind(&self.club_id)
        .bind(&self.status)
        .bind(&self.payment_id)
        .bind(self.registered_at)
        .execute(db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
