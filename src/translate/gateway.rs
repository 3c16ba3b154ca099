//! Translation gateway
//!
//! Front door for every translation attempt: local validation, the quota
//! gate, exactly one upstream call, and the charge policy. Upstream
//! failures never escape as errors; callers get a [`TranslateOutcome`] and
//! the diagnostic goes to the log.

use crate::config::MAX_TEXT_CHARS;
use crate::rate_limit::{QuotaDecision, UsageTracker};
use crate::storage::StorageError;
use crate::translate::{catalog, TranslationBackend};
use std::sync::Arc;
use tracing::warn;

/// Outcome of a gated translation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// Empty or whitespace-only input, returned as-is without an API call.
    Unchanged(String),
    Translated(String),
    /// Local validation failure, no API call, no quota consumed.
    TooLong { chars: usize, max: usize },
    /// Rejected by the quota gate before any API call.
    QuotaExceeded { used: u32, limit: u32 },
    /// Upstream failure (timeout, non-2xx, malformed payload).
    Failed,
}

/// Rate-limited gateway over a [`TranslationBackend`].
#[derive(Clone)]
pub struct TranslationGateway {
    backend: Arc<dyn TranslationBackend>,
    quota: UsageTracker,
    charge_failed_attempts: bool,
}

impl TranslationGateway {
    #[must_use]
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        quota: UsageTracker,
        charge_failed_attempts: bool,
    ) -> Self {
        Self {
            backend,
            quota,
            charge_failed_attempts,
        }
    }

    /// The quota tracker, for status queries and admin resets.
    #[must_use]
    pub fn quota(&self) -> &UsageTracker {
        &self.quota
    }

    /// The full language catalog, unconditionally.
    #[must_use]
    pub fn languages(&self) -> &'static [(&'static str, &'static str)] {
        catalog::LANGUAGES
    }

    /// Translate `text` into `target_lang`, gating on the user's quota when
    /// a user id is supplied.
    ///
    /// # Errors
    ///
    /// Returns an error only when the quota store itself fails; upstream
    /// translation failures are reported through the outcome.
    pub async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        user_id: Option<i64>,
    ) -> Result<TranslateOutcome, StorageError> {
        if text.trim().is_empty() {
            return Ok(TranslateOutcome::Unchanged(text.to_string()));
        }

        let chars = text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Ok(TranslateOutcome::TooLong {
                chars,
                max: MAX_TEXT_CHARS,
            });
        }

        if let Some(user_id) = user_id {
            if let QuotaDecision::Exceeded { used, limit } =
                self.quota.can_translate(user_id).await?
            {
                return Ok(TranslateOutcome::QuotaExceeded { used, limit });
            }
        }

        let result = self.backend.translate(text, target_lang).await;

        // Charge on attempt: the call reached the API, so it counts even
        // when the upstream fails (unless configured otherwise).
        if let Some(user_id) = user_id {
            if self.charge_failed_attempts || result.is_ok() {
                self.quota.record_usage(user_id).await?;
            }
        }

        match result {
            Ok(translated) => Ok(TranslateOutcome::Translated(translated)),
            Err(e) => {
                warn!("Translation failed: {e}");
                Ok(TranslateOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::translate::{TranslateError, TranslationBackend};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeBackend {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationBackend for FakeBackend {
        async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslateError::Api("boom".to_string()));
            }
            Ok(format!("[{target_lang}] {text}"))
        }
    }

    fn gateway(backend: Arc<FakeBackend>, charge_failed: bool) -> TranslationGateway {
        let quota = UsageTracker::new(Storage::in_memory(), 20);
        TranslationGateway::new(backend, quota, charge_failed)
    }

    #[tokio::test]
    async fn test_empty_input_passthrough() -> Result<(), StorageError> {
        let backend = FakeBackend::new(false);
        let gw = gateway(backend.clone(), true);

        let outcome = gw.translate("", "en", Some(7)).await?;
        assert_eq!(outcome, TranslateOutcome::Unchanged(String::new()));
        let outcome = gw.translate("   \n", "en", Some(7)).await?;
        assert_eq!(outcome, TranslateOutcome::Unchanged("   \n".to_string()));

        assert_eq!(backend.calls(), 0);
        assert_eq!(gw.quota().usage(7).await?.used, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_too_long_rejected_locally() -> Result<(), StorageError> {
        let backend = FakeBackend::new(false);
        let gw = gateway(backend.clone(), true);

        let long = "я".repeat(1001);
        let outcome = gw.translate(&long, "en", Some(7)).await?;
        assert_eq!(
            outcome,
            TranslateOutcome::TooLong {
                chars: 1001,
                max: 1000
            }
        );
        assert_eq!(backend.calls(), 0);
        assert_eq!(gw.quota().usage(7).await?.used, 0);

        // Exactly at the limit still goes through.
        let ok = "я".repeat(1000);
        assert!(matches!(
            gw.translate(&ok, "en", Some(7)).await?,
            TranslateOutcome::Translated(_)
        ));
        assert_eq!(backend.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_quota_gate_blocks_before_call() -> Result<(), StorageError> {
        let backend = FakeBackend::new(false);
        let gw = gateway(backend.clone(), true);

        for _ in 0..20 {
            gw.quota().record_usage(7).await?;
        }

        let outcome = gw.translate("hello", "en", Some(7)).await?;
        assert_eq!(
            outcome,
            TranslateOutcome::QuotaExceeded {
                used: 20,
                limit: 20
            }
        );
        assert_eq!(backend.calls(), 0);
        assert_eq!(gw.quota().usage(7).await?.used, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_attempt_still_charges() -> Result<(), StorageError> {
        let backend = FakeBackend::new(true);
        let gw = gateway(backend.clone(), true);

        let outcome = gw.translate("hello", "en", Some(7)).await?;
        assert_eq!(outcome, TranslateOutcome::Failed);
        assert_eq!(backend.calls(), 1);
        assert_eq!(gw.quota().usage(7).await?.used, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_charge_on_success_policy() -> Result<(), StorageError> {
        let backend = FakeBackend::new(true);
        let gw = gateway(backend.clone(), false);

        let outcome = gw.translate("hello", "en", Some(7)).await?;
        assert_eq!(outcome, TranslateOutcome::Failed);
        assert_eq!(gw.quota().usage(7).await?.used, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_anonymous_calls_skip_quota() -> Result<(), StorageError> {
        let backend = FakeBackend::new(false);
        let gw = gateway(backend.clone(), true);

        let outcome = gw.translate("hello", "es", None).await?;
        assert_eq!(
            outcome,
            TranslateOutcome::Translated("[es] hello".to_string())
        );
        Ok(())
    }
}
