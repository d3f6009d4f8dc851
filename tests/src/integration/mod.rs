//! Cross-subsystem choreography tests.

pub mod failover;
pub mod idempotence;
pub mod wire_flow;
