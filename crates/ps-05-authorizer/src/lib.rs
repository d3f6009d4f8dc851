//! # Authorizer (PS-05)
//!
//! Decides whether a routed transaction is approved, without touching any
//! balance. Checks run as fail-fast stages:
//!
//! | Stage | Check                                  | Decline            |
//! |-------|----------------------------------------|--------------------|
//! | 1     | Account format, checksum, existence    | `InvalidAccount`   |
//! | 1     | Account status                         | `AccountBlocked`   |
//! | 2     | Currency admitted for the account      | `UnsupportedCurrency` |
//! | 2     | Amount within the account limit        | `LimitExceeded`    |
//! | 2     | Velocity inside the sliding window     | `VelocityExceeded` |
//! | 3     | Risk score below the threshold         | `SuspectedFraud`   |
//!
//! An internal fault (directory unreachable, scorer panic boundary) is
//! never surfaced as a hard decline: the authorizer answers
//! `Declined(IssuerUnavailable)` so the dispatcher may retry elsewhere.

pub mod account;
pub mod authorize;
pub mod config;
pub mod ports;
pub mod risk;
pub mod velocity;

pub use account::{luhn_valid, AccountRecord, AccountStatus};
pub use authorize::Authorizer;
pub use config::AuthorizerConfig;
pub use ports::{AccountDirectory, DirectoryError, InMemoryDirectory};
pub use risk::{HeuristicScorer, RiskScorer};
pub use velocity::VelocityTracker;
