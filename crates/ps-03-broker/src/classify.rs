//! Classification and admission.

use shared_types::message::{slots, MessageFunction, Mti};
use shared_types::{ChannelId, MessageCategory, TraceKey, TransactionMessage};
use tracing::debug;

use crate::admission::{AdmissionConfig, AdmissionError};
use crate::trace_cache::TraceCache;

/// Metadata the broker attaches to an admitted message. Consumed by the
/// dispatcher; the broker itself never selects an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: MessageCategory,
    pub priority: u8,
}

/// An admitted message with its trace key and classification.
#[derive(Debug, Clone)]
pub struct AdmittedTransaction {
    pub message: TransactionMessage,
    pub trace: TraceKey,
    pub classification: Classification,
}

/// The broker: pure classification plus admission state (the duplicate
/// cache). Constructed once with its configuration; no ambient globals.
#[derive(Debug)]
pub struct Broker {
    config: AdmissionConfig,
    traces: TraceCache,
}

impl Broker {
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            traces: TraceCache::default(),
        }
    }

    /// Classifies and admits a message from `channel`.
    ///
    /// # Errors
    ///
    /// A rejected message must never continue toward the authorizer. The
    /// caller answers [`AdmissionError::DuplicateTrace`] from the stored
    /// outcome when one exists; every other error goes to the null router.
    pub fn classify(
        &self,
        message: TransactionMessage,
        channel: &ChannelId,
    ) -> Result<AdmittedTransaction, AdmissionError> {
        let category = accepted_category(&message.mti)?;

        let admission = self
            .config
            .channel(channel)
            .ok_or_else(|| AdmissionError::ChannelNotAdmitted(channel.clone()))?;
        if !admission.categories.contains(&category) {
            return Err(AdmissionError::CategoryNotAdmitted {
                channel: channel.clone(),
                category,
            });
        }

        for slot in mandatory_slots(category) {
            if !message.has(*slot) {
                return Err(AdmissionError::MissingSlot { slot: *slot });
            }
        }

        // Mandatory-slot checks above guarantee STAN and timestamp.
        let trace = extract_trace(&message, channel)
            .ok_or(AdmissionError::MissingSlot { slot: slots::STAN })?;

        // Reversals legitimately reuse the original trace key; fresh
        // requests must not.
        if category != MessageCategory::Reversal && !self.traces.check_and_insert(&trace) {
            return Err(AdmissionError::DuplicateTrace(trace));
        }

        let classification = Classification {
            category,
            priority: admission.priority,
        };
        debug!(%trace, ?category, priority = admission.priority, "Message admitted");
        Ok(AdmittedTransaction {
            message,
            trace,
            classification,
        })
    }
}

/// Builds the trace key from a message's STAN, source channel, and
/// transmission timestamp.
#[must_use]
pub fn extract_trace(message: &TransactionMessage, channel: &ChannelId) -> Option<TraceKey> {
    let stan = message.stan()?;
    let transmitted_at = message.timestamp()?;
    Some(TraceKey::new(stan, channel.clone(), transmitted_at))
}

/// The request/advice legs the switch accepts inbound, by category.
fn accepted_category(mti: &Mti) -> Result<MessageCategory, AdmissionError> {
    let unaccepted = || AdmissionError::UnacceptedMessageType {
        mti: mti.to_string(),
    };
    if mti.version != Mti::CURRENT_VERSION {
        return Err(unaccepted());
    }
    match (mti.category, mti.function) {
        (MessageCategory::Authorization | MessageCategory::Financial, MessageFunction::Request)
        | (MessageCategory::Reversal, MessageFunction::Request | MessageFunction::Advice)
        | (MessageCategory::Network, MessageFunction::Request) => Ok(mti.category),
        _ => Err(unaccepted()),
    }
}

/// Slots that must be present for a category to be admitted.
fn mandatory_slots(category: MessageCategory) -> &'static [u16] {
    match category {
        MessageCategory::Authorization | MessageCategory::Financial | MessageCategory::Reversal => {
            &[
                slots::ACCOUNT_REF,
                slots::PROCESSING_CODE,
                slots::AMOUNT,
                slots::TIMESTAMP,
                slots::STAN,
            ]
        }
        MessageCategory::Network => &[slots::TIMESTAMP, slots::STAN],
    }
}
