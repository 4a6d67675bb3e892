//! warmgrid-router: routes warmup targets to their strategies.
//!
//! Each target may carry its own strategy; targets without one, or with
//! the router's default, share the default bucket. Every bucket runs on
//! its own task and the router waits for all of them.
//!
//! # Architecture
//!
//! ```text
//! WarmupHandler::run(targets)
//!   ├── DeadlineProvider::remaining_time_millis()
//!   └── StrategyRouter::route(deadline, targets)
//!       ├── default bucket  → tokio::spawn(default.warmup())
//!       ├── strategy B      → tokio::spawn(b.warmup())
//!       └── join all → CompositeStrategyError if any bucket failed
//! ```
//!
//! `StrategyRegistry` maps names to strategy instances; routing itself
//! compares instances, never names.

pub mod deadline;
pub mod handler;
pub mod registry;
pub mod router;

pub use deadline::{FixedDeadline, InstantDeadline};
pub use handler::WarmupHandler;
pub use registry::StrategyRegistry;
pub use router::StrategyRouter;
