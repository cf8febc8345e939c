//! Time-windowed alert deduplication.
//!
//! Each violation class keeps its own last-alert timestamp; a class is
//! admitted again only after the alert interval has fully elapsed. The
//! record is updated in the same step as the admission decision, so a
//! class admitted once in a frame cannot be admitted again by a duplicate
//! detection in that same frame.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::detect::PpeClass;

pub const DEFAULT_ALERT_INTERVAL: Duration = Duration::from_secs(15);

/// Per-class minimum-interval admission.
///
/// The record is bounded by the closed class set; no eviction is needed.
pub struct AlertThrottle {
    interval: Duration,
    last_alert: HashMap<PpeClass, Instant>,
}

impl AlertThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_alert: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timestamp of the last admitted alert for a class, if any.
    pub fn last_alert(&self, class: PpeClass) -> Option<Instant> {
        self.last_alert.get(&class).copied()
    }

    /// Admit the subset of `classes` eligible to alert at `now`, and stamp
    /// each admitted class's record with `now` atomically with admission.
    ///
    /// One class's cooldown never blocks another's.
    pub fn admit(&mut self, classes: &[PpeClass], now: Instant) -> Vec<PpeClass> {
        let mut admitted = Vec::new();
        for &class in classes {
            let eligible = match self.last_alert.get(&class) {
                None => true,
                Some(&last) => now.saturating_duration_since(last) >= self.interval,
            };
            if eligible {
                self.last_alert.insert(class, now);
                admitted.push(class);
            }
        }
        admitted
    }
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_alert_is_always_admitted() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        let admitted = throttle.admit(&[PpeClass::NoHardhat], t0);
        assert_eq!(admitted, vec![PpeClass::NoHardhat]);
        assert_eq!(throttle.last_alert(PpeClass::NoHardhat), Some(t0));
    }

    #[test]
    fn repeat_within_interval_is_suppressed() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        throttle.admit(&[PpeClass::NoHardhat], t0);

        let t5 = t0 + Duration::from_secs(5);
        assert!(throttle.admit(&[PpeClass::NoHardhat], t5).is_empty());
        // Record untouched by the suppressed attempt.
        assert_eq!(throttle.last_alert(PpeClass::NoHardhat), Some(t0));
    }

    #[test]
    fn repeat_after_interval_is_admitted_again() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        throttle.admit(&[PpeClass::NoHardhat], t0);

        let t16 = t0 + Duration::from_secs(16);
        assert_eq!(
            throttle.admit(&[PpeClass::NoHardhat], t16),
            vec![PpeClass::NoHardhat]
        );
        assert_eq!(throttle.last_alert(PpeClass::NoHardhat), Some(t16));
    }

    #[test]
    fn interval_boundary_is_inclusive() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        throttle.admit(&[PpeClass::NoMask], t0);

        let t15 = t0 + DEFAULT_ALERT_INTERVAL;
        assert_eq!(throttle.admit(&[PpeClass::NoMask], t15), vec![PpeClass::NoMask]);
    }

    #[test]
    fn classes_are_throttled_independently() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        throttle.admit(&[PpeClass::NoHardhat], t0);

        let t5 = t0 + Duration::from_secs(5);
        let admitted = throttle.admit(&[PpeClass::NoHardhat, PpeClass::NoSafetyVest], t5);
        assert_eq!(admitted, vec![PpeClass::NoSafetyVest]);
    }

    #[test]
    fn duplicate_class_in_one_frame_is_admitted_once() {
        let mut throttle = AlertThrottle::default();
        let t0 = Instant::now();
        let admitted = throttle.admit(&[PpeClass::NoMask, PpeClass::NoMask], t0);
        assert_eq!(admitted, vec![PpeClass::NoMask]);
    }
}
