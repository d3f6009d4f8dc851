//! Admission configuration and errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared_types::{ChannelId, MessageCategory, TraceKey};
use thiserror::Error;

/// What one channel is allowed to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAdmission {
    /// Message categories this channel may originate.
    pub categories: Vec<MessageCategory>,
    /// Dispatch priority attached to traffic from this channel (0 = highest).
    #[serde(default)]
    pub priority: u8,
}

/// Per-channel admission rules. A channel absent from the map is not
/// admitted at all, whatever key it authenticated with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub channels: HashMap<ChannelId, ChannelAdmission>,
}

impl AdmissionConfig {
    /// Admission entry for `channel`, if the channel is admitted.
    #[must_use]
    pub fn channel(&self, channel: &ChannelId) -> Option<&ChannelAdmission> {
        self.channels.get(channel)
    }
}

/// Why the broker refused a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The MTI is structurally valid but not acceptable inbound (wrong
    /// version, or a response/advice leg arriving where a request belongs).
    #[error("Message type {mti} not accepted inbound")]
    UnacceptedMessageType { mti: String },

    /// The source channel has no admission entry.
    #[error("Channel {0} is not admitted")]
    ChannelNotAdmitted(ChannelId),

    /// The channel may not originate this category.
    #[error("Channel {channel} may not originate {category:?} messages")]
    CategoryNotAdmitted {
        channel: ChannelId,
        category: MessageCategory,
    },

    /// A mandatory slot for the category is absent.
    #[error("Mandatory slot {slot} missing")]
    MissingSlot { slot: u16 },

    /// The trace key was already seen inside the suppression window.
    #[error("Duplicate trace key {0}")]
    DuplicateTrace(TraceKey),
}
