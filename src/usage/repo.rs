use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append-only storage for usage records.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn count_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64>;
    async fn append(&self, user_id: Uuid, endpoint: &str, at: OffsetDateTime) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUsageStore {
    db: PgPool,
}

impl PgUsageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn count_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
              FROM meal_usages
             WHERE user_id = $1 AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.db)
        .await
        .context("count meal usages")?;
        Ok(count)
    }

    async fn append(&self, user_id: Uuid, endpoint: &str, at: OffsetDateTime) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meal_usages (user_id, endpoint, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(endpoint)
        .bind(at)
        .execute(&self.db)
        .await
        .context("insert meal usage")?;
        Ok(())
    }
}

/// One successful call to a metered endpoint.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub user_id: Uuid,
    pub endpoint: String,
    pub created_at: OffsetDateTime,
}

/// Process-local store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryUsageStore {
    rows: std::sync::Mutex<Vec<UsageRecord>>,
}

#[cfg(test)]
impl InMemoryUsageStore {
    pub fn records(&self) -> Vec<UsageRecord> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn count_since(&self, user_id: Uuid, since: OffsetDateTime) -> anyhow::Result<i64> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("usage store lock poisoned"))?;
        let count = rows
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn append(&self, user_id: Uuid, endpoint: &str, at: OffsetDateTime) -> anyhow::Result<()> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("usage store lock poisoned"))?
            .push(UsageRecord {
                user_id,
                endpoint: endpoint.to_string(),
                created_at: at,
            });
        Ok(())
    }
}
