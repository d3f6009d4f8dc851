//! # Null Router (PS-07)
//!
//! Terminal sink for traffic the switch refuses to process: malformed
//! frames, inadmissible messages, and transactions no routing rule can
//! place. Discarding is O(1) and never blocks the caller; the sink's only
//! obligations are the audit trail (log line, bus event, recent-discard
//! ring) and the response code the acquirer is owed.

pub mod sink;

pub use sink::{DiscardReason, DiscardRecord, NullRouter};
