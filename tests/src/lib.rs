//! # Payment Switch Test Suite
//!
//! Unified test crate containing cross-subsystem tests:
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared configuration and message builders
//! └── integration/      # Cross-subsystem choreography
//!     ├── failover.rs   # Cascading failover and health transitions
//!     ├── idempotence.rs# Duplicate suppression and ledger replay
//!     └── wire_flow.rs  # Full ingress-to-response flows over TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ps-tests
//!
//! # By category
//! cargo test -p ps-tests integration::failover::
//! cargo test -p ps-tests integration::idempotence::
//! cargo test -p ps-tests integration::wire_flow::
//!
//! # Benchmarks
//! cargo bench -p ps-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
