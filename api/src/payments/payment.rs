use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum PaymentType {
    #[serde(rename = "event")]
    #[sqlx(rename = "event")]
    Event,
    #[serde(rename = "club-membership")]
    #[sqlx(rename = "club-membership")]
    ClubMembership,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Event => "event",
            PaymentType::ClubMembership => "club-membership",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    /// The processor's checkout session id; unique across all payments.
    pub transaction_id: String,
    pub user_email: String,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub club_id: Option<String>,
    pub event_id: Option<String>,
    pub event_title: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) const PAYMENT_COLUMNS: &str = "id, transaction_id, user_email, amount, payment_type, \
     club_id, event_id, event_title, category, status, created_at";

impl Payment {
    pub async fn for_user(user_email: &str, db: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_email = ? ORDER BY created_at DESC"
        ))
        .bind(user_email)
        .fetch_all(db)
        .await?;

        Ok(payments)
    }

    /// Single-statement insert keyed on transaction_id. A payment already
    /// recorded for the session is never overwritten. Returns whether a row was written.
    pub async fn insert_if_absent(&self, db: &SqlitePool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (id, transaction_id, user_email, amount, payment_type,
                                  club_id, event_id, event_title, category, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(&self.id)
        .bind(&self.transaction_id)
        .bind(&self.user_email)
        .bind(self.amount)
        .bind(self.payment_type)
        .bind(&self.club_id)
        .bind(&self.event_id)
        .bind(&self.event_title)
        .bind(&self.category)
        .bind(&self.status)
        .bind(self.created_at)
        .execute(db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
