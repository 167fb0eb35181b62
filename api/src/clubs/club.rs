use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ClubStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl FromStr for ClubStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClubStatus::Pending),
            "approved" => Ok(ClubStatus::Approved),
            "rejected" => Ok(ClubStatus::Rejected),
            other => Err(anyhow::anyhow!("Unknown club status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub banner_image: Option<String>,
    pub membership_fee: Option<f64>,
    pub manager_email: Option<String>,
    pub status: ClubStatus,
    pub created_at: DateTime<Utc>,
}

pub(crate) const CLUB_COLUMNS: &str = "id, name, description, category, location, banner_image, \
     membership_fee, manager_email, status, created_at";

impl Club {
    pub async fn from_id(id: &str, db: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        let club = sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = ?"))
            .bind(id)
            .fetch_optional(db)
            .await?;

        Ok(club)
    }

    pub async fn managed_by(manager_email: &str, db: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let clubs = sqlx::query_as::<_, Club>(&format!(
            "SELECT {CLUB_COLUMNS} FROM clubs WHERE manager_email = ? ORDER BY created_at DESC"
        ))
        .bind(manager_email)
        .fetch_all(db)
        .await?;

        Ok(clubs)
    }

    pub async fn insert(&self, db: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO clubs (id, name, description, category, location, banner_image,
                               membership_fee, manager_email, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(&self.category)
        .bind(&self.location)
        .bind(&self.banner_image)
        .bind(self.membership_fee)
        .bind(&self.manager_email)
        .bind(self.status)
        .bind(self.created_at)
        .execute(db)
        .await?;

        Ok(())
    }
}
