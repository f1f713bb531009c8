//! Scanner defense
//!
//! [`SuspiciousPatternSet`] flags exploit probes, [`AbuseDetector`] counts
//! offenses per address and decides bans, [`BanRegistry`] remembers them.

pub mod bans;
pub mod detector;
pub mod rules;

pub use bans::BanRegistry;
pub use detector::{AbuseDetector, BanNotice, Classification};
pub use rules::{Rule, SuspiciousPatternSet};
