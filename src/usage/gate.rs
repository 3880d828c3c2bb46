use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use time::{OffsetDateTime, Time, UtcOffset};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::repo::UsageStore;

/// Outcome of one quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageDecision {
    pub allowed: bool,
    /// Calls counted today, including this one when allowed.
    pub used_today: i64,
}

/// Quota figures shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub used_today: i64,
    pub daily_limit: u32,
    pub remaining: i64,
}

impl UsageSnapshot {
    pub fn new(used_today: i64, daily_limit: u32) -> Self {
        Self {
            used_today,
            daily_limit,
            remaining: (i64::from(daily_limit) - used_today).max(0),
        }
    }
}

pub fn start_of_utc_day(now: OffsetDateTime) -> OffsetDateTime {
    now.to_offset(UtcOffset::UTC).replace_time(Time::MIDNIGHT)
}

/// Daily call budget shared by every metered endpoint.
///
/// Counting and recording for one user happen under that user's lock, so
/// concurrent requests cannot both slip under the limit.
pub struct UsageGate {
    store: Arc<dyn UsageStore>,
    daily_limit: u32,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl UsageGate {
    pub fn new(store: Arc<dyn UsageStore>, daily_limit: u32) -> Self {
        Self {
            store,
            daily_limit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub async fn authorize(&self, user_id: Uuid, endpoint: &str) -> anyhow::Result<UsageDecision> {
        self.authorize_at(user_id, endpoint, OffsetDateTime::now_utc()).await
    }

    /// Counts today's calls and, when under the limit, records this one.
    pub async fn authorize_at(
        &self,
        user_id: Uuid,
        endpoint: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<UsageDecision> {
        let user_lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(user_id).or_default().clone()
        };
        let decision = {
            let _guard = user_lock.lock().await;
            self.check_and_record(user_id, endpoint, now).await
        };
        drop(user_lock);
        self.release(user_id).await;
        decision
    }

    async fn check_and_record(
        &self,
        user_id: Uuid,
        endpoint: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<UsageDecision> {
        let used = self.store.count_since(user_id, start_of_utc_day(now)).await?;
        if used >= i64::from(self.daily_limit) {
            warn!(%user_id, endpoint, used, limit = self.daily_limit, "daily limit reached");
            return Ok(UsageDecision {
                allowed: false,
                used_today: used,
            });
        }

        self.store.append(user_id, endpoint, now).await?;
        debug!(%user_id, endpoint, used = used + 1, "usage recorded");
        Ok(UsageDecision {
            allowed: true,
            used_today: used + 1,
        })
    }

    /// Drops the user's lock once no request holds or awaits it.
    async fn release(&self, user_id: Uuid) {
        let mut locks = self.locks.lock().await;
        if locks.get(&user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&user_id);
        }
    }

    /// Read-only count of today's calls.
    pub async fn used_today(&self, user_id: Uuid) -> anyhow::Result<i64> {
        self.store
            .count_since(user_id, start_of_utc_day(OffsetDateTime::now_utc()))
            .await
    }

    pub async fn snapshot(&self, user_id: Uuid) -> anyhow::Result<UsageSnapshot> {
        Ok(UsageSnapshot::new(self.used_today(user_id).await?, self.daily_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::repo::InMemoryUsageStore;
    use time::macros::datetime;

    fn gate(limit: u32) -> (Arc<UsageGate>, Arc<InMemoryUsageStore>) {
        let store = Arc::new(InMemoryUsageStore::default());
        (Arc::new(UsageGate::new(store.clone(), limit)), store)
    }

    #[test]
    fn day_starts_at_utc_midnight() {
        assert_eq!(
            start_of_utc_day(datetime!(2026-03-04 17:45:12.5 UTC)),
            datetime!(2026-03-04 00:00:00 UTC)
        );
        assert_eq!(
            start_of_utc_day(datetime!(2026-03-05 01:00 +05:30)),
            datetime!(2026-03-04 00:00:00 UTC)
        );
    }

    #[tokio::test]
    async fn fifth_call_is_rejected_without_recording() {
        let (gate, store) = gate(4);
        let user = Uuid::new_v4();
        let now = datetime!(2026-03-04 12:00 UTC);

        for expected in 1..=4 {
            let d = gate.authorize_at(user, "/calculate-gl", now).await.unwrap();
            assert!(d.allowed);
            assert_eq!(d.used_today, expected);
        }

        let d = gate.authorize_at(user, "/parse-meal-chat", now).await.unwrap();
        assert_eq!(d, UsageDecision { allowed: false, used_today: 4 });
        assert_eq!(store.records().len(), 4);
    }

    #[tokio::test]
    async fn budget_resets_after_utc_midnight() {
        let (gate, _) = gate(4);
        let user = Uuid::new_v4();
        for _ in 0..4 {
            gate.authorize_at(user, "/calculate-gl", datetime!(2026-03-04 23:59:59 UTC))
                .await
                .unwrap();
        }
        let d = gate
            .authorize_at(user, "/calculate-gl", datetime!(2026-03-05 00:00:00 UTC))
            .await
            .unwrap();
        assert!(d.allowed);
        assert_eq!(d.used_today, 1);
    }

    #[tokio::test]
    async fn users_have_separate_budgets() {
        let (gate, _) = gate(1);
        let now = datetime!(2026-03-04 12:00 UTC);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(gate.authorize_at(a, "/calculate-gl", now).await.unwrap().allowed);
        assert!(!gate.authorize_at(a, "/calculate-gl", now).await.unwrap().allowed);
        assert!(gate.authorize_at(b, "/calculate-gl", now).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn concurrent_calls_cannot_exceed_limit() {
        let (gate, store) = gate(4);
        let user = Uuid::new_v4();
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.authorize(user, "/calculate-gl").await.unwrap() })
            })
            .collect();

        let mut allowed = 0;
        for h in handles {
            if h.await.unwrap().allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 4);
        assert_eq!(store.records().len(), 4);
    }

    #[tokio::test]
    async fn per_user_locks_are_dropped_when_idle() {
        let (gate, _) = gate(4);
        let now = datetime!(2026-03-04 12:00 UTC);
        for _ in 0..6 {
            gate.authorize_at(Uuid::new_v4(), "/calculate-gl", now).await.unwrap();
        }
        assert!(gate.locks.lock().await.is_empty());

        let user = Uuid::new_v4();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.authorize(user, "/calculate-gl").await.unwrap() })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert!(gate.locks.lock().await.is_empty());
    }

    #[test]
    fn snapshot_remaining_never_negative() {
        assert_eq!(UsageSnapshot::new(1, 4).remaining, 3);
        assert_eq!(UsageSnapshot::new(6, 4).remaining, 0);
    }
}
