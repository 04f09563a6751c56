// src/usage.rs
// Process-lifetime token usage accounting with threshold alerts
//
// Counters live only in memory. They start at zero when the process starts and are
// reset only by a restart; callers wanting history across restarts will not get it.

use crate::config::EffectiveConfig;
use parking_lot::Mutex;
use serde::Serialize;

/// Accumulated token consumption
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub requests_count: u64,
}

impl TokenUsage {
    /// Percentage of `budget` consumed; zero budget reports zero
    pub fn percentage_of(&self, budget: u64) -> f64 {
        if budget == 0 {
            return 0.0;
        }
        (self.total_tokens as f64 / budget as f64) * 100.0
    }
}

/// Point-in-time view returned to callers (GET /config/token-usage)
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub usage: TokenUsage,
    /// Usage as a percentage of `max_tokens_per_request`, two decimals
    pub percentage: f64,
    pub threshold: u8,
    pub alert: bool,
}

impl UsageSnapshot {
    /// Status line describing an active alert
    pub fn alert_message(&self) -> Option<String> {
        self.alert.then(|| {
            format!(
                "Token usage at {:.1}% of configured budget (threshold {}%)",
                self.percentage, self.threshold
            )
        })
    }
}

/// Shared accumulator. Increments are serialized under one lock, so concurrent
/// analyses never lose an update.
#[derive(Debug, Default)]
pub struct TokenUsageTracker {
    inner: Mutex<TokenUsage>,
}

impl TokenUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one model call's tokens
    pub fn record(&self, prompt_tokens: u64, completion_tokens: u64) -> TokenUsage {
        let mut usage = self.inner.lock();
        usage.prompt_tokens = usage.prompt_tokens.saturating_add(prompt_tokens);
        usage.completion_tokens = usage.completion_tokens.saturating_add(completion_tokens);
        usage.total_tokens = usage.prompt_tokens.saturating_add(usage.completion_tokens);
        usage.requests_count += 1;
        *usage
    }

    pub fn usage(&self) -> TokenUsage {
        *self.inner.lock()
    }

    pub fn snapshot(&self, config: &EffectiveConfig) -> UsageSnapshot {
        let usage = self.usage();
        let raw = usage.percentage_of(config.max_tokens_per_request);
        UsageSnapshot {
            usage,
            percentage: (raw * 100.0).round() / 100.0,
            threshold: config.token_usage_threshold,
            alert: config.enable_token_monitoring && raw >= f64::from(config.token_usage_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn config(max: u64, threshold: u8, monitoring: bool) -> EffectiveConfig {
        EffectiveConfig {
            max_tokens_per_request: max,
            token_usage_threshold: threshold,
            enable_token_monitoring: monitoring,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_at_zero() {
        let tracker = TokenUsageTracker::new();
        assert_eq!(tracker.usage(), TokenUsage::default());
    }

    #[test]
    fn test_record_accumulates() {
        let tracker = TokenUsageTracker::new();
        tracker.record(100, 20);
        let usage = tracker.record(50, 5);
        assert_eq!(usage.prompt_tokens, 150);
        assert_eq!(usage.completion_tokens, 25);
        assert_eq!(usage.total_tokens, 175);
        assert_eq!(usage.requests_count, 2);
    }

    #[test]
    fn test_alert_at_threshold() {
        let tracker = TokenUsageTracker::new();
        tracker.record(700, 100);

        let snap = tracker.snapshot(&config(1000, 80, true));
        assert_eq!(snap.percentage, 80.0);
        assert!(snap.alert);
        assert!(snap.alert_message().unwrap().contains("80.0%"));

        let snap = tracker.snapshot(&config(1000, 81, true));
        assert!(!snap.alert);
        assert!(snap.alert_message().is_none());
    }

    #[test]
    fn test_no_alert_when_monitoring_disabled() {
        let tracker = TokenUsageTracker::new();
        tracker.record(5000, 5000);
        let snap = tracker.snapshot(&config(1000, 10, false));
        assert!(snap.percentage > 100.0);
        assert!(!snap.alert);
    }

    #[test]
    fn test_percentage_rounded_to_two_decimals() {
        let tracker = TokenUsageTracker::new();
        tracker.record(1, 0);
        let snap = tracker.snapshot(&config(3, 100, true));
        assert_eq!(snap.percentage, 33.33);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let tracker = Arc::new(TokenUsageTracker::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    tracker.record(3, 2);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let usage = tracker.usage();
        assert_eq!(usage.requests_count, 3200);
        assert_eq!(usage.prompt_tokens, 9600);
        assert_eq!(usage.completion_tokens, 6400);
        assert_eq!(usage.total_tokens, 16000);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_usage_is_monotonic_and_consistent(
            calls in proptest::collection::vec((0u64..1_000_000, 0u64..1_000_000), 0..50)
        ) {
            let tracker = TokenUsageTracker::new();
            let mut previous = tracker.usage();
            for (prompt, completion) in calls {
                let current = tracker.record(prompt, completion);
                prop_assert!(current.prompt_tokens >= previous.prompt_tokens);
                prop_assert!(current.completion_tokens >= previous.completion_tokens);
                prop_assert!(current.total_tokens >= previous.total_tokens);
                prop_assert_eq!(current.requests_count, previous.requests_count + 1);
                prop_assert_eq!(current.total_tokens, current.prompt_tokens + current.completion_tokens);
                previous = current;
            }
        }
    }
}
