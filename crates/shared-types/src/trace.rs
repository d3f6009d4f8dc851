//! # Trace Keys
//!
//! The per-transaction correlation identifier. A [`TraceKey`] is the
//! composite of the System Trace Audit Number, the source channel, and a
//! timestamp window. It is unique per in-flight transaction and is reused
//! verbatim by retries and reversals so downstream duplicate detection can
//! correlate them with the original attempt.

use serde::{Deserialize, Serialize};

/// Identifier of a source channel (ATM fleet, POS concentrator, e-commerce
/// gateway). Stable across reconnects; configured, not negotiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Composite correlation key: STAN + source channel + timestamp window.
///
/// STANs are six-digit counters that wrap, so the timestamp window (the
/// transmission timestamp truncated to [`TraceKey::WINDOW_SECS`]) is part of
/// the key to keep wrapped STANs from colliding across windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraceKey {
    /// System Trace Audit Number (0..=999_999).
    pub stan: u32,
    /// Source channel the transaction entered through.
    pub channel: ChannelId,
    /// Transmission timestamp truncated to the correlation window.
    pub window: u64,
}

impl TraceKey {
    /// Width of the correlation window in seconds.
    pub const WINDOW_SECS: u64 = 600;

    /// Builds a trace key from a STAN, channel, and raw transmission
    /// timestamp (seconds since epoch).
    #[must_use]
    pub fn new(stan: u32, channel: ChannelId, transmitted_at: u64) -> Self {
        Self {
            stan: stan % 1_000_000,
            channel,
            window: transmitted_at / Self::WINDOW_SECS,
        }
    }
}

impl std::fmt::Display for TraceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06}-{}-{}", self.stan, self.channel, self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stan_different_windows_do_not_collide() {
        let a = TraceKey::new(42, ChannelId::from("atm-01"), 0);
        let b = TraceKey::new(42, ChannelId::from("atm-01"), TraceKey::WINDOW_SECS);
        assert_ne!(a, b);
    }

    #[test]
    fn same_window_same_key() {
        let a = TraceKey::new(42, ChannelId::from("atm-01"), 10);
        let b = TraceKey::new(42, ChannelId::from("atm-01"), TraceKey::WINDOW_SECS - 1);
        assert_eq!(a, b);
    }

    #[test]
    fn stan_wraps_at_six_digits() {
        let key = TraceKey::new(1_234_567, ChannelId::from("pos-07"), 0);
        assert_eq!(key.stan, 234_567);
        assert_eq!(key.to_string(), "234567-pos-07-0");
    }
}
