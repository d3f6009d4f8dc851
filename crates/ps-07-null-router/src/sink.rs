//! The discard sink.

use parking_lot::Mutex;
use shared_bus::{EventPublisher, SwitchEvent};
use shared_types::{ResponseCode, TraceKey};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;

/// Why a message was discarded. Each reason maps to the response code the
/// originating channel receives (when the message was well-formed enough
/// to answer at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The frame failed structural decoding.
    Malformed(String),
    /// The broker refused admission.
    Inadmissible(String),
    /// No routing rule matched, or all matching rules were dead.
    Unroutable,
    /// Envelope verification failed; the frame is untrusted.
    Unverified(String),
}

impl DiscardReason {
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::Malformed(_) | Self::Inadmissible(_) | Self::Unverified(_) => {
                ResponseCode::FormatError
            }
            Self::Unroutable => ResponseCode::IssuerUnavailable,
        }
    }

    /// Short label for metrics and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::Inadmissible(_) => "inadmissible",
            Self::Unroutable => "unroutable",
            Self::Unverified(_) => "unverified",
        }
    }
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(detail) => write!(f, "malformed: {detail}"),
            Self::Inadmissible(detail) => write!(f, "inadmissible: {detail}"),
            Self::Unroutable => f.write_str("unroutable"),
            Self::Unverified(detail) => write!(f, "unverified: {detail}"),
        }
    }
}

/// One discarded message, as kept in the recent-discard ring.
#[derive(Debug, Clone)]
pub struct DiscardRecord {
    pub trace: Option<TraceKey>,
    pub reason: DiscardReason,
    pub discarded_at: SystemTime,
}

/// Retained discard records for operator inspection.
const RING_CAPACITY: usize = 1_024;

pub struct NullRouter {
    bus: Arc<dyn EventPublisher>,
    recent: Mutex<VecDeque<DiscardRecord>>,
}

impl NullRouter {
    #[must_use]
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            bus,
            recent: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
        }
    }

    /// Discards one message. Returns the response code the caller owes the
    /// originating channel, when one can be sent at all.
    pub async fn discard(&self, trace: Option<TraceKey>, reason: DiscardReason) -> ResponseCode {
        let code = reason.response_code();
        match &trace {
            Some(t) => warn!(trace = %t, %reason, "transaction discarded"),
            None => warn!(%reason, "frame discarded before trace extraction"),
        }

        {
            let mut recent = self.recent.lock();
            if recent.len() == RING_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(DiscardRecord {
                trace: trace.clone(),
                reason: reason.clone(),
                discarded_at: SystemTime::now(),
            });
        }

        self.bus
            .publish(SwitchEvent::TransactionDiscarded {
                trace,
                reason: reason.to_string(),
                code,
            })
            .await;
        code
    }

    /// Most recent discards, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<DiscardRecord> {
        self.recent.lock().iter().cloned().collect()
    }
}
