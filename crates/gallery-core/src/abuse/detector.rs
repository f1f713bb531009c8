//! Offense tracking
//!
//! Classifies request targets against the denylist and keeps a per-address
//! history of offense timestamps inside a trailing window.

use super::rules::{Rule, SuspiciousPatternSet};
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of classifying a request target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Clean,
    /// Carries the name of the first rule that matched
    Suspicious(&'static str),
}

impl Classification {
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Classification::Suspicious(_))
    }
}

/// Decision to ban an address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanNotice {
    pub address: String,
    /// Offenses inside the window when the decision was made
    pub offenses: usize,
}

/// Denylist classifier plus windowed offense history
pub struct AbuseDetector {
    patterns: SuspiciousPatternSet,
    window: Duration,
    strikes: usize,
    history: Mutex<HashMap<String, Vec<Instant>>>,
}

impl AbuseDetector {
    pub fn new(patterns: SuspiciousPatternSet, window: Duration, strikes: usize) -> Self {
        Self {
            patterns,
            window,
            strikes: strikes.max(1),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Standard denylist, one hour window, ban on first offense.
    pub fn standard() -> Result<Self> {
        Ok(Self::new(
            SuspiciousPatternSet::standard()?,
            Duration::from_secs(60 * 60),
            1,
        ))
    }

    pub fn classify(&self, target: &str) -> Classification {
        match self.patterns.find_match(target) {
            Some(rule) => Classification::Suspicious(Rule::name(rule)),
            None => Classification::Clean,
        }
    }

    /// Record an offense for `address` now.
    pub fn record_offense(&self, address: &str) -> Option<BanNotice> {
        self.record_offense_at(address, Instant::now())
    }

    /// Record an offense at `now` and decide whether the address is banned.
    ///
    /// Every history is pruned to the window first, and addresses left with
    /// no offenses are forgotten. With `strikes == 1` the offense just
    /// recorded is always in the window, so the first offense bans.
    pub fn record_offense_at(&self, address: &str, now: Instant) -> Option<BanNotice> {
        let mut history = self.history.lock();
        history.retain(|_, entries| {
            prune(entries, now, self.window);
            !entries.is_empty()
        });

        let entries = history.entry(address.to_string()).or_default();
        entries.push(now);

        if entries.len() >= self.strikes {
            Some(BanNotice {
                address: address.to_string(),
                offenses: entries.len(),
            })
        } else {
            None
        }
    }

    /// In-window offense timestamps for `address` as of `now`.
    pub fn offenses_at(&self, address: &str, now: Instant) -> Vec<Instant> {
        let mut history = self.history.lock();
        match history.get_mut(address) {
            Some(entries) => {
                prune(entries, now, self.window);
                let live = entries.clone();
                if entries.is_empty() {
                    history.remove(address);
                }
                live
            }
            None => Vec::new(),
        }
    }
}

/// Drop entries that are `window` or more older than `now`.
fn prune(entries: &mut Vec<Instant>, now: Instant, window: Duration) {
    entries.retain(|&t| now.saturating_duration_since(t) < window);
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn detector(strikes: usize) -> AbuseDetector {
        AbuseDetector::new(SuspiciousPatternSet::standard().unwrap(), HOUR, strikes)
    }

    #[test]
    fn test_classify() {
        let d = detector(1);
        assert_eq!(d.classify("/random_image"), Classification::Clean);
        assert_eq!(d.classify("/etc/passwd"), Classification::Suspicious("etc-passwd"));
        assert!(d.classify("/wp-login.php").is_suspicious());
    }

    #[test]
    fn test_first_offense_bans() {
        let d = AbuseDetector::standard().unwrap();
        let notice = d.record_offense("1.2.3.4").unwrap();
        assert_eq!(notice.address, "1.2.3.4");
        assert_eq!(notice.offenses, 1);
    }

    #[test]
    fn test_stale_offenses_are_pruned() {
        let d = detector(1);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(61 * 60);

        d.record_offense_at("1.2.3.4", t0);
        let notice = d.record_offense_at("1.2.3.4", t1).unwrap();

        assert_eq!(notice.offenses, 1);
        assert_eq!(d.offenses_at("1.2.3.4", t1), vec![t1]);
    }

    #[test]
    fn test_offense_at_window_edge_expires() {
        let d = detector(1);
        let t0 = Instant::now();
        d.record_offense_at("a", t0);
        assert_eq!(d.offenses_at("a", t0 + HOUR - Duration::from_secs(1)).len(), 1);
        assert!(d.offenses_at("a", t0 + HOUR).is_empty());
    }

    #[test]
    fn test_strikes_threshold() {
        let d = detector(3);
        let t0 = Instant::now();

        assert!(d.record_offense_at("a", t0).is_none());
        assert!(d.record_offense_at("a", t0 + Duration::from_secs(10)).is_none());
        let notice = d.record_offense_at("a", t0 + Duration::from_secs(20)).unwrap();
        assert_eq!(notice.offenses, 3);

        // Other addresses keep their own history.
        assert!(d.record_offense_at("b", t0).is_none());
    }

    #[test]
    fn test_strikes_outside_window_do_not_count() {
        let d = detector(2);
        let t0 = Instant::now();

        assert!(d.record_offense_at("a", t0).is_none());
        assert!(d.record_offense_at("a", t0 + HOUR + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_quiet_addresses_are_forgotten() {
        let d = detector(2);
        let t0 = Instant::now();

        for i in 0..50 {
            d.record_offense_at(&format!("10.0.0.{i}"), t0);
        }
        assert_eq!(d.history.lock().len(), 50);

        d.record_offense_at("10.0.1.1", t0 + HOUR);
        let history = d.history.lock();
        assert_eq!(history.len(), 1);
        assert!(history.contains_key("10.0.1.1"));
    }
}
