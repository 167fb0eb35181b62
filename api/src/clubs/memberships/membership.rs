use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Expired,
}

impl MembershipStatus {
    /// A membership whose expiry is already in the past is expired.
    pub fn at(expire_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if expire_date < now {
            MembershipStatus::Expired
        } else {
            MembershipStatus::Active
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubMembership {
    pub id: String,
    pub user_email: String,
    pub club_id: String,
    pub club_name: Option<String>,
    pub category: Option<String>,
    pub manager_email: Option<String>,
    pub banner_image: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub payment_id: Option<String>,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    pub expire_date: Option<DateTime<Utc>>,
}

pub(crate) const MEMBERSHIP_COLUMNS: &str = "id, user_email, club_id, club_name, category, \
     manager_email, banner_image, location, description, payment_id, status, joined_at, expire_date";

impl ClubMembership {
    pub async fn for_manager(
        manager_email: &str,
        db: &SqlitePool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, ClubMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM club_memberships WHERE manager_email = ? ORDER BY joined_at DESC"
        ))
        .bind(manager_email)
        .fetch_all(db)
        .await?;

        Ok(memberships)
    }

    pub async fn for_user(user_email: &str, db: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, ClubMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM club_memberships WHERE user_email = ? ORDER BY joined_at DESC"
        ))
        .bind(user_email)
        .fetch_all(db)
        .await?;

        Ok(memberships)
    }

    /// Single-statement insert keyed on (club_id, user_email). An existing
    /// membership is left untouched. Returns whether a row was written.
    pub async fn insert_if_absent(&self, db: &SqlitePool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO club_memberships (id, user_email, club_id, club_name, category,
                                          manager_email, banner_image, location, description,
                                          payment_id, status, joined_at, expire_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (club_id, user_email) DO NOTHING
            "#,
        )
        .bind(&self.id)
        .bind(&self.user_email)
        .bind(&self.club_id)
        .bind(&self.club_name)
        .bind(&self.category)
        .bind(&self.manager_email)
        .bind(&self.banner_image)
        .bind(&self.location)
        .bind(&self.description)
        .bind(&self.payment_id)
        .bind(self.status)
        .bind(self.joined_at)
        .bind(self.expire_date)
        .execute(db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
