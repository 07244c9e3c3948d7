//! Rejection notifications and their debounce.
//!
//! Verdicts are pure values; surfacing them to a person happens here, at the
//! boundary. A [`NotificationThrottle`] suppresses repeats of the same kind of
//! rejection inside a minimum interval so a user dragging an edge around does
//! not get a burst of identical warnings.

use crate::verdict::{ReasonCode, Rejection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Receives rejections that made it through the throttle.
pub trait Notifier: Send + Sync {
    fn notify(&self, rejection: &Rejection);
}

/// Emits each rejection as a `tracing` warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, rejection: &Rejection) {
        tracing::warn!(reason = %rejection.code(), "{rejection}");
    }
}

impl<F> Notifier for F
where
    F: Fn(&Rejection) + Send + Sync,
{
    fn notify(&self, rejection: &Rejection) {
        self(rejection);
    }
}

/// Throttle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum time between two notifications of the same reason, in
    /// milliseconds.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_min_interval_ms() -> u64 {
    2000
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl ThrottleConfig {
    #[must_use]
    pub fn new(min_interval_ms: u64) -> Self {
        Self { min_interval_ms }
    }

    fn interval_ms(&self) -> i64 {
        i64::try_from(self.min_interval_ms).unwrap_or(i64::MAX)
    }
}

/// Per-reason debounce for rejection notifications.
///
/// Clones share state.
#[derive(Debug)]
pub struct NotificationThrottle {
    config: ThrottleConfig,
    /// Last notification time per reason.
    last: Arc<RwLock<HashMap<ReasonCode, DateTime<Utc>>>>,
}

impl NotificationThrottle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns true if a rejection of this reason should be shown now, and
    /// records it if so.
    pub fn should_notify(&self, code: ReasonCode) -> bool {
        self.should_notify_at(code, Utc::now())
    }

    /// Like [`should_notify`](Self::should_notify) with an explicit clock.
    pub fn should_notify_at(&self, code: ReasonCode, now: DateTime<Utc>) -> bool {
        let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
        let due = last
            .get(&code)
            .is_none_or(|previous| {
                (now - *previous).num_milliseconds() >= self.config.interval_ms()
            });
        if due {
            last.insert(code, now);
        }
        due
    }

    /// Forgets every recorded notification.
    pub fn reset(&self) {
        self.last
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

impl Clone for NotificationThrottle {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            last: Arc::clone(&self.last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
    }

    #[test]
    fn first_notification_passes() {
        let throttle = NotificationThrottle::default();
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(0)));
    }

    #[test]
    fn repeats_inside_the_interval_are_suppressed() {
        let throttle = NotificationThrottle::new(ThrottleConfig::new(2000));
        assert!(throttle.should_notify_at(ReasonCode::LimitExceeded, at(0)));
        assert!(!throttle.should_notify_at(ReasonCode::LimitExceeded, at(500)));
        assert!(!throttle.should_notify_at(ReasonCode::LimitExceeded, at(1999)));
        assert!(throttle.should_notify_at(ReasonCode::LimitExceeded, at(2000)));
    }

    #[test]
    fn suppressed_attempts_do_not_extend_the_window() {
        let throttle = NotificationThrottle::new(ThrottleConfig::new(1000));
        assert!(throttle.should_notify_at(ReasonCode::LimitExceeded, at(0)));
        assert!(!throttle.should_notify_at(ReasonCode::LimitExceeded, at(900)));
        assert!(throttle.should_notify_at(ReasonCode::LimitExceeded, at(1000)));
    }

    #[test]
    fn reasons_are_throttled_independently() {
        let throttle = NotificationThrottle::default();
        assert!(throttle.should_notify_at(ReasonCode::LimitExceeded, at(0)));
        assert!(throttle.should_notify_at(ReasonCode::NoMatchingRule, at(10)));
        assert!(!throttle.should_notify_at(ReasonCode::LimitExceeded, at(20)));
    }

    #[test]
    fn reset_clears_state() {
        let throttle = NotificationThrottle::default();
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(0)));
        throttle.reset();
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(1)));
    }

    #[test]
    fn clones_share_state() {
        let throttle = NotificationThrottle::default();
        let clone = throttle.clone();
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(0)));
        assert!(!clone.should_notify_at(ReasonCode::RuleViolation, at(1)));
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let throttle = NotificationThrottle::new(ThrottleConfig::new(0));
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(0)));
        assert!(throttle.should_notify_at(ReasonCode::RuleViolation, at(0)));
    }

    #[test]
    fn config_defaults_from_empty_json() {
        let config: ThrottleConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, ThrottleConfig::default());
        assert_eq!(config.min_interval_ms, 2000);
    }

    #[test]
    fn closures_are_notifiers() {
        let seen = Mutex::new(Vec::new());
        let notifier = |rejection: &Rejection| {
            seen.lock().expect("lock").push(rejection.code());
        };
        notifier.notify(&Rejection::not_allowed());
        assert_eq!(*seen.lock().expect("lock"), vec![ReasonCode::NoMatchingRule]);
    }
}
