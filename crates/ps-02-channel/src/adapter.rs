//! Channel adapter contract.

use std::collections::HashMap;

use async_trait::async_trait;
use shared_types::{ChannelId, ChannelKey, TransactionMessage};

use crate::errors::ChannelError;

/// Outcome of delivering a response (or any outbound message) to a peer.
///
/// `Indeterminate` is deliberately distinct from `Failed`: the bytes may
/// have reached the peer, so the caller must treat the operation's effect
/// as unknown and run reversal logic rather than assume either outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message was written and acknowledged by the transport.
    Delivered,
    /// The message was provably not delivered.
    Failed,
    /// The message was written but confirmation never arrived.
    Indeterminate,
}

/// A source-protocol boundary: normalizes inbound requests into canonical
/// messages and delivers outbound responses.
#[async_trait]
pub trait ChannelAdapter: Send {
    /// The channel this adapter serves.
    fn channel(&self) -> &ChannelId;

    /// Receives the next authenticated, decoded message. Returns `Ok(None)`
    /// when the peer hangs up cleanly.
    async fn receive(&mut self) -> Result<Option<TransactionMessage>, ChannelError>;

    /// Delivers a response to the peer.
    async fn respond(&mut self, message: &TransactionMessage) -> DeliveryOutcome;
}

/// Channel identity → shared key. Built from configuration at startup;
/// a peer claiming an identity without a key here is rejected.
#[derive(Debug, Clone, Default)]
pub struct ChannelKeyring {
    keys: HashMap<ChannelId, ChannelKey>,
}

impl ChannelKeyring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel key, replacing any previous key for the channel.
    pub fn insert(&mut self, channel: ChannelId, key: ChannelKey) {
        self.keys.insert(channel, key);
    }

    /// Key for `channel`, if the channel is provisioned.
    #[must_use]
    pub fn key_for(&self, channel: &ChannelId) -> Option<&ChannelKey> {
        self.keys.get(channel)
    }

    /// Number of provisioned channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
