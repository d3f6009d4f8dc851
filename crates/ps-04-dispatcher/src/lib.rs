//! # Dispatcher (PS-04)
//!
//! Routes admitted transactions to authorization endpoints and drives the
//! cascading fallback loop when an endpoint soft-fails.
//!
//! ```text
//!   AdmittedTransaction
//!         |
//!         v
//!   +-----------------+     snapshot      +--------------------+
//!   |  RoutingTable   | <---------------- | EndpointHealthStore|
//!   |  (priority scan)|                   |  (RwLock, counters)|
//!   +-----------------+                   +--------------------+
//!         |                                        ^
//!         v  candidates                            | probes
//!   +-----------------+                   +--------------------+
//!   | fallback loop   | ----------------> |   HealthChecker    |
//!   | (per-key mutex) |   outcomes        |  (background task) |
//!   +-----------------+                   +--------------------+
//! ```
//!
//! ## Invariants
//!
//! - Rules are evaluated in ascending priority order; the first rule whose
//!   predicate matches and that has at least one routable endpoint wins.
//! - Retries reuse the original [`TraceKey`](shared_types::TraceKey) so
//!   downstream deduplication can recognise them.
//! - Retries for a given trace key are strictly sequential: a per-key async
//!   mutex is held for the whole fallback loop.
//! - Attempt count across all endpoints of a rule never exceeds
//!   `max_attempts`.
//! - Endpoint state transitions to `Down` and back are owned by the
//!   background [`HealthChecker`]; the routing path only records attempt
//!   outcomes (which may degrade a healthy endpoint).

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod health_checker;
pub mod keyed_mutex;
pub mod ports;
pub mod routing;

pub use config::{DispatcherConfig, HealthCheckConfig};
pub use dispatch::{Dispatcher, RouteOutcome};
pub use errors::EndpointError;
pub use health::{EndpointHealthStore, EndpointStatus};
pub use health_checker::HealthChecker;
pub use ports::{EndpointConnector, EndpointProber};
pub use routing::RoutingTable;
