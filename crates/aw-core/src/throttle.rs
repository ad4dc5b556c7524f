use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_THROTTLE_WINDOW_SECS: u64 = 300;

/// Per-service cool-down tracker for analysis triggers.
///
/// State is process-local and lost on restart; the worst case after a
/// restart is one extra borderline-duplicate trigger. Entries are never
/// evicted: one per distinct service name seen over the process lifetime.
pub struct AlertThrottle {
    window: Duration,
    last_trigger: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl AlertThrottle {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(300)),
            last_trigger: Mutex::new(HashMap::new()),
        }
    }

    /// True when a trigger for `service` fired within the window ending at
    /// `now`.
    pub fn should_throttle(&self, service: &str, now: DateTime<Utc>) -> bool {
        let guard = self
            .last_trigger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.get(service) {
            Some(last) => now.signed_duration_since(*last) < self.window,
            None => false,
        }
    }

    /// Record a trigger decision. Called unconditionally so the window
    /// resets from the most recent attempt.
    pub fn record_trigger(&self, service: &str, now: DateTime<Utc>) {
        let mut guard = self
            .last_trigger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(service.to_string(), now);
    }
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_THROTTLE_WINDOW_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_is_not_throttled() {
        let throttle = AlertThrottle::default();
        assert!(!throttle.should_throttle("resume-agent", Utc::now()));
    }

    #[test]
    fn second_trigger_inside_window_is_throttled() {
        let throttle = AlertThrottle::default();
        let now = Utc::now();
        throttle.record_trigger("resume-agent", now);
        assert!(throttle.should_throttle("resume-agent", now + Duration::seconds(60)));
        assert!(!throttle.should_throttle("cover-letter-agent", now + Duration::seconds(60)));
    }

    #[test]
    fn trigger_beyond_window_is_allowed_again() {
        let throttle = AlertThrottle::default();
        let now = Utc::now();
        throttle.record_trigger("resume-agent", now);
        assert!(!throttle.should_throttle("resume-agent", now + Duration::seconds(301)));
    }

    #[test]
    fn record_trigger_resets_the_window() {
        let throttle = AlertThrottle::default();
        let now = Utc::now();
        throttle.record_trigger("resume-agent", now);
        // A later (throttled) attempt still refreshes the window.
        throttle.record_trigger("resume-agent", now + Duration::seconds(200));
        assert!(throttle.should_throttle("resume-agent", now + Duration::seconds(400)));
        assert!(!throttle.should_throttle("resume-agent", now + Duration::seconds(501)));
    }
}
