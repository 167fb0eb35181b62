use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub club_id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
    pub is_paid: bool,
    pub event_fee: Option<f64>,
    pub max_attendees: Option<i64>,
    pub manager_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const EVENT_COLUMNS: &str = "id, club_id, title, description, event_date, location, \
     is_paid, event_fee, max_attendees, manager_email, created_at";

impl Event {
    pub async fn insert(&self, db: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO events (id, club_id, title, description, event_date, location,
                                is_paid, event_fee, max_attendees, manager_email, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.club_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(self.event_date)
        .bind(&self.location)
        .bind(self.is_paid)
        .bind(self.event_fee)
        .bind(self.max_attendees)
        .bind(&self.manager_email)
        .bind(self.created_at)
        .execute(db)
        .await?;

        Ok(())
    }
}
