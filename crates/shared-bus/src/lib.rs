//! # Shared Bus - Event Bus for Switch Audit Events
//!
//! Subsystems publish lifecycle events here instead of calling each other's
//! observers directly. The pipeline itself is a call chain (channel → broker
//! → dispatcher → authorizer → processor); the bus carries the *audit*
//! choreography: every admission, route selection, fallback attempt,
//! decision, completion, discard, and health transition is observable
//! without coupling any subsystem to its watchers.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Dispatcher  │                    │ Audit/Alerts │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing never blocks the hot path: a bus with no subscribers drops
//! the event and keeps going.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, SwitchEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Topic label used for discard events that need offline investigation.
pub const DLQ_TOPIC: &str = "discard.audit";
