use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2, never exposed
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

/// Answers whether a token's subject still has an account.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"#)
            .bind(id)
            .fetch_one(&self.db)
            .await
            .context("check user exists")?;
        Ok(exists)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct InMemoryUserDirectory {
    ids: std::sync::Mutex<std::collections::HashSet<Uuid>>,
}

#[cfg(test)]
impl InMemoryUserDirectory {
    pub fn with_user(id: Uuid) -> Self {
        let dir = Self::default();
        dir.ids.lock().unwrap().insert(id);
        dir
    }
}

#[cfg(test)]
#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn exists(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.ids.lock().unwrap().contains(&id))
    }
}
