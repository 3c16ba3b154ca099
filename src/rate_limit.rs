//! Per-user daily translation quota
//!
//! Counters live in a single persisted table keyed `"<user>_<date>"` with a
//! global date watermark: the first operation seen on a later UTC day
//! clears every counter at once rather than expiring keys one by one.

use crate::storage::{Storage, StorageError};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Storage key of the usage table document.
pub const USAGE_KEY: &str = "usage";

/// Read-only quota snapshot for status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Result of the quota gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Exceeded { used: u32, limit: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageTable {
    /// Global watermark: the calendar day the counters belong to.
    date: NaiveDate,
    counters: HashMap<String, u32>,
}

impl UsageTable {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            counters: HashMap::new(),
        }
    }

    fn key(user_id: i64, date: NaiveDate) -> String {
        format!("{user_id}_{date}")
    }

    /// Advance the watermark, dropping all counters when the day changed.
    fn roll(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.counters.clear();
        self.date = today;
        true
    }
}

/// Daily quota tracker over persisted counters.
#[derive(Clone)]
pub struct UsageTracker {
    storage: Storage,
    limit: u32,
}

impl UsageTracker {
    #[must_use]
    pub fn new(storage: Storage, limit: u32) -> Self {
        Self { storage, limit }
    }

    /// The configured daily limit.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Gate a translation attempt; rolls the watermark first.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage table cannot be read or written.
    pub async fn can_translate(&self, user_id: i64) -> Result<QuotaDecision, StorageError> {
        self.can_translate_on(user_id, Utc::now().date_naive()).await
    }

    /// Count one attempted upstream call.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage table cannot be read or written.
    pub async fn record_usage(&self, user_id: i64) -> Result<(), StorageError> {
        self.record_usage_on(user_id, Utc::now().date_naive()).await
    }

    /// Read-only snapshot of today's usage.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage table cannot be read.
    pub async fn usage(&self, user_id: i64) -> Result<Usage, StorageError> {
        self.usage_on(user_id, Utc::now().date_naive()).await
    }

    /// Zero today's counter. `false` when no counter existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the usage table cannot be read or written.
    pub async fn reset(&self, user_id: i64) -> Result<bool, StorageError> {
        self.reset_on(user_id, Utc::now().date_naive()).await
    }

    async fn can_translate_on(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<QuotaDecision, StorageError> {
        let mut table = self.load(today).await?;
        if table.roll(today) {
            info!("Usage counters reset for {today}");
            self.save(&table).await?;
        }

        let used = table
            .counters
            .get(&UsageTable::key(user_id, today))
            .copied()
            .unwrap_or(0);
        if used >= self.limit {
            return Ok(QuotaDecision::Exceeded {
                used,
                limit: self.limit,
            });
        }
        Ok(QuotaDecision::Allowed)
    }

    async fn record_usage_on(&self, user_id: i64, today: NaiveDate) -> Result<(), StorageError> {
        let mut table = self.load(today).await?;
        table.roll(today);
        *table
            .counters
            .entry(UsageTable::key(user_id, today))
            .or_insert(0) += 1;
        self.save(&table).await
    }

    async fn usage_on(&self, user_id: i64, today: NaiveDate) -> Result<Usage, StorageError> {
        let table = self.load(today).await?;
        // A stale table needs no rewrite here: yesterday's keys can't match
        // today's lookup key.
        let used = table
            .counters
            .get(&UsageTable::key(user_id, today))
            .copied()
            .unwrap_or(0);
        Ok(Usage {
            used,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
        })
    }

    async fn reset_on(&self, user_id: i64, today: NaiveDate) -> Result<bool, StorageError> {
        let mut table = self.load(today).await?;
        table.roll(today);
        let key = UsageTable::key(user_id, today);
        match table.counters.get_mut(&key) {
            Some(count) => {
                *count = 0;
                self.save(&table).await?;
                info!("Reset usage counter for user {user_id}");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn load(&self, today: NaiveDate) -> Result<UsageTable, StorageError> {
        Ok(self
            .storage
            .load_json::<UsageTable>(USAGE_KEY)
            .await?
            .unwrap_or_else(|| UsageTable::empty(today)))
    }

    async fn save(&self, table: &UsageTable) -> Result<(), StorageError> {
        self.storage.save_json(USAGE_KEY, table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("valid test date")
    }

    fn tracker(limit: u32) -> UsageTracker {
        UsageTracker::new(Storage::in_memory(), limit)
    }

    #[tokio::test]
    async fn test_counts_accumulate() -> Result<(), StorageError> {
        let tracker = tracker(20);
        let today = day("2025-06-01");

        for n in 1..=5 {
            assert_eq!(
                tracker.can_translate_on(7, today).await?,
                QuotaDecision::Allowed
            );
            tracker.record_usage_on(7, today).await?;
            let usage = tracker.usage_on(7, today).await?;
            assert_eq!(usage.used, n);
            assert_eq!(usage.remaining, 20 - n);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_quota_ceiling_is_idempotent() -> Result<(), StorageError> {
        let tracker = tracker(20);
        let today = day("2025-06-01");

        for _ in 0..20 {
            assert_eq!(
                tracker.can_translate_on(7, today).await?,
                QuotaDecision::Allowed
            );
            tracker.record_usage_on(7, today).await?;
        }

        // The 21st attempt is rejected and the counter stays at the limit.
        assert_eq!(
            tracker.can_translate_on(7, today).await?,
            QuotaDecision::Exceeded {
                used: 20,
                limit: 20
            }
        );
        assert_eq!(tracker.usage_on(7, today).await?.used, 20);
        assert_eq!(tracker.usage_on(7, today).await?.remaining, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rollover_clears_all_users() -> Result<(), StorageError> {
        let tracker = tracker(20);
        let d1 = day("2025-06-01");
        let d2 = day("2025-06-02");

        tracker.record_usage_on(7, d1).await?;
        tracker.record_usage_on(8, d1).await?;
        assert_eq!(tracker.usage_on(7, d1).await?.used, 1);
        assert_eq!(tracker.usage_on(8, d1).await?.used, 1);

        // First gate on the next day advances the global watermark and
        // clears both users together.
        assert_eq!(
            tracker.can_translate_on(7, d2).await?,
            QuotaDecision::Allowed
        );
        assert_eq!(tracker.usage_on(7, d2).await?.used, 0);
        assert_eq!(tracker.usage_on(8, d2).await?.used, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_semantics() -> Result<(), StorageError> {
        let tracker = tracker(20);
        let today = day("2025-06-01");

        // Nothing recorded yet: count is already implicitly zero.
        assert!(!tracker.reset_on(7, today).await?);

        tracker.record_usage_on(7, today).await?;
        tracker.record_usage_on(7, today).await?;
        assert!(tracker.reset_on(7, today).await?);
        assert_eq!(tracker.usage_on(7, today).await?.used, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_quota_recovers_next_day() -> Result<(), StorageError> {
        let tracker = tracker(2);
        let d1 = day("2025-06-01");
        let d2 = day("2025-06-02");

        tracker.record_usage_on(7, d1).await?;
        tracker.record_usage_on(7, d1).await?;
        assert!(matches!(
            tracker.can_translate_on(7, d1).await?,
            QuotaDecision::Exceeded { .. }
        ));

        assert_eq!(
            tracker.can_translate_on(7, d2).await?,
            QuotaDecision::Allowed
        );
        Ok(())
    }
}
