//! # `AuthenticatedEnvelope`
//!
//! The universal wrapper for frames exchanged with channel peers. Both
//! endpoints of a channel authenticate with a shared key before any payload
//! is processed; an envelope that fails verification never reaches the
//! broker.
//!
//! ## Security Properties
//!
//! - **Versioning**: every envelope carries a protocol version checked
//!   before deserialization of the payload.
//! - **Envelope Authority**: `channel` is the sole source of truth for the
//!   peer's identity; payloads never duplicate it.
//! - **Time-Bounded Replay Prevention**: nonces are only valid within the
//!   timestamp window and are tracked by the channel's nonce cache.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use uuid::Uuid;

use crate::errors::MessageError;
use crate::security::{self, ChannelKey, NonceCache};
use crate::trace::ChannelId;

/// The universal authenticated frame wrapper.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedEnvelope<T> {
    /// Protocol version for forward compatibility.
    pub version: u16,

    /// Identity of the sending channel peer. The SOLE source of truth for
    /// sender identity.
    pub channel: ChannelId,

    /// Unix timestamp (seconds) when the envelope was created.
    pub timestamp: u64,

    /// Unique nonce for replay prevention within the timestamp window.
    pub nonce: Uuid,

    /// HMAC-SHA256 tag over the header and payload bytes.
    #[serde_as(as = "serde_with::Bytes")]
    pub tag: [u8; 32],

    /// The wrapped payload.
    pub payload: T,
}

impl<T: AsRef<[u8]>> AuthenticatedEnvelope<T> {
    /// Current envelope protocol version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Wraps and tags a payload for transmission.
    #[must_use]
    pub fn seal(channel: ChannelId, key: &ChannelKey, timestamp: u64, payload: T) -> Self {
        let nonce = Uuid::new_v4();
        let tag = key.tag(&Self::tag_input(
            Self::CURRENT_VERSION,
            &channel,
            timestamp,
            nonce,
            payload.as_ref(),
        ));
        Self {
            version: Self::CURRENT_VERSION,
            channel,
            timestamp,
            nonce,
            tag,
            payload,
        }
    }

    /// Verifies version, timestamp window, replay nonce, and tag, in that
    /// order. Only a fully verified envelope yields its payload.
    pub fn verify(&self, key: &ChannelKey, nonces: &NonceCache, now: u64) -> Result<(), MessageError> {
        if self.version != Self::CURRENT_VERSION {
            return Err(MessageError::UnsupportedVersion {
                received: self.version,
                supported: Self::CURRENT_VERSION,
            });
        }
        if !security::timestamp_in_window(self.timestamp, now) {
            return Err(MessageError::TimestampOutOfRange {
                timestamp: self.timestamp,
            });
        }
        let input = Self::tag_input(
            self.version,
            &self.channel,
            self.timestamp,
            self.nonce,
            self.payload.as_ref(),
        );
        if !key.verify(&input, &self.tag) {
            return Err(MessageError::InvalidTag);
        }
        // Nonce check last: a forged frame must not consume cache capacity.
        if !nonces.check_and_insert(self.nonce) {
            return Err(MessageError::ReplayDetected {
                nonce: self.nonce.to_string(),
            });
        }
        Ok(())
    }

    fn tag_input(
        version: u16,
        channel: &ChannelId,
        timestamp: u64,
        nonce: Uuid,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut input = Vec::with_capacity(2 + channel.as_str().len() + 8 + 16 + payload.len());
        input.extend_from_slice(&version.to_be_bytes());
        input.extend_from_slice(channel.as_str().as_bytes());
        input.extend_from_slice(&timestamp.to_be_bytes());
        input.extend_from_slice(nonce.as_bytes());
        input.extend_from_slice(payload);
        input
    }
}
