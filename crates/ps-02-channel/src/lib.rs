//! # Channel Adapter Subsystem
//!
//! The per-source-protocol boundary of the switch. A channel adapter owns
//! exactly three jobs:
//!
//! 1. **Framing** — length-prefixed for ATM/POS lines, newline-delimited
//!    for the e-commerce gateway bridge.
//! 2. **Peer authentication** — both endpoints prove possession of the
//!    shared channel key via the `AuthenticatedEnvelope` before any payload
//!    is processed; unauthenticated frames never reach the broker.
//! 3. **Delivery outcomes** — a transport failure after a request was
//!    written but before a response arrived surfaces as
//!    [`DeliveryOutcome::Indeterminate`], distinct from both success and
//!    failure, so callers can trigger reversal logic instead of guessing.

pub mod adapter;
pub mod errors;
pub mod framing;
pub mod tcp;

pub use adapter::{ChannelAdapter, ChannelKeyring, DeliveryOutcome};
pub use errors::ChannelError;
pub use framing::Framing;
pub use tcp::{ChannelClient, TcpChannelAdapter};
