use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub enum Role {
    #[default]
    Member,
    ClubManager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::ClubManager => "clubManager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "clubManager" => Ok(Role::ClubManager),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow::anyhow!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn from_email(email: &str, db: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, photo_url, role, created_at
            FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    /// Looks a user up by email and role, the check behind the `role` query gates.
    pub async fn with_role(
        email: &str,
        role: &str,
        db: &SqlitePool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, photo_url, role, created_at
            FROM users WHERE email = ? AND role = ?
            "#,
        )
        .bind(email)
        .bind(role)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    /// Inserts the user unless the email is taken. Returns whether a row was written.
    pub async fn insert_if_absent(&self, db: &SqlitePool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, photo_url, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&self.id)
        .bind(&self.email)
        .bind(&self.name)
        .bind(&self.photo_url)
        .bind(self.role)
        .bind(self.created_at)
        .execute(db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
