//! # Centralized Channel Security Module
//!
//! The single, authoritative implementation of channel authentication for
//! the switch. Every channel adapter uses this module rather than rolling
//! its own HMAC handling, so security policy changes propagate to all
//! channels at once.
//!
//! ## Security Properties
//!
//! - **HMAC-SHA256 Tags**: every frame is tagged with a per-channel key.
//! - **Time-Bounded Validity**: envelopes expire after [`MAX_AGE`] seconds.
//! - **Nonce Replay Prevention**: each nonce is valid once within the window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Maximum allowed clock skew for future timestamps (seconds).
pub const MAX_FUTURE_SKEW: u64 = 10;

/// Maximum age for valid timestamps (seconds).
pub const MAX_AGE: u64 = 60;

/// Duration to retain nonces in cache (2x the validity window).
pub const NONCE_CACHE_TTL: Duration = Duration::from_secs(120);

/// Maximum nonce cache size before forced cleanup.
pub const MAX_NONCE_CACHE_SIZE: usize = 100_000;

// =============================================================================
// CHANNEL KEYS
// =============================================================================

/// Symmetric key shared between the switch and one channel peer.
#[derive(Clone)]
pub struct ChannelKey(Vec<u8>);

impl ChannelKey {
    #[must_use]
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    /// Computes the HMAC-SHA256 tag over `data`.
    #[must_use]
    pub fn tag(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.0)
            .unwrap_or_else(|_| HmacSha256::new_from_slice(b"\0").expect("hmac accepts any key length"));
        mac.update(data);
        let out = mac.finalize().into_bytes();
        let mut tag = [0u8; 32];
        tag.copy_from_slice(&out);
        tag
    }

    /// Constant-time verification of a tag over `data`.
    #[must_use]
    pub fn verify(&self, data: &[u8], tag: &[u8; 32]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.0) else {
            return false;
        };
        mac.update(data);
        mac.verify_slice(tag).is_ok()
    }
}

impl std::fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in logs.
        f.write_str("ChannelKey(..)")
    }
}

// =============================================================================
// NONCE CACHE
// =============================================================================

/// Thread-safe nonce cache for replay prevention.
///
/// Tracks seen nonces with their expiry instants, evicting expired entries
/// on access. Bounded to prevent memory exhaustion from a hostile peer.
#[derive(Debug, Default)]
pub struct NonceCache {
    cache: RwLock<HashMap<Uuid, Instant>>,
}

impl NonceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the nonce is fresh and records it; `false` on replay.
    pub fn check_and_insert(&self, nonce: Uuid) -> bool {
        let now = Instant::now();
        let mut cache = self.cache.write();

        cache.retain(|_, expiry| *expiry > now);
        if cache.len() >= MAX_NONCE_CACHE_SIZE {
            // Full even after eviction: reject rather than grow unbounded.
            tracing::warn!(size = cache.len(), "nonce cache at capacity, rejecting frame");
            return false;
        }
        match cache.entry(nonce) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(now + NONCE_CACHE_TTL);
                true
            }
        }
    }

    /// Number of live nonces currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

/// Validates an envelope timestamp against the acceptance window.
///
/// Valid window: `now - MAX_AGE <= timestamp <= now + MAX_FUTURE_SKEW`.
#[must_use]
pub fn timestamp_in_window(timestamp: u64, now: u64) -> bool {
    // Saturating arithmetic: the timestamp is attacker-controlled and may
    // sit at either extreme of the u64 range.
    now.saturating_sub(MAX_AGE) <= timestamp && timestamp <= now.saturating_add(MAX_FUTURE_SKEW)
}
