//! warmgrid-dispatch: time-budgeted warmup invocation dispatch.
//!
//! Splits a run's deadline into iterations, issues a ramping number of
//! non-blocking invocations per target each round, and resolves the
//! pending handles on a pool of background workers.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//!   ├── IterationPlan (slice, per-iteration count, leftover)
//!   ├── CountPolicy   (how many invocations per target this round)
//!   ├── PayloadBuilder (what each invocation carries)
//!   ├── Invoker::invoke_async() → InvocationHandle
//!   └── ResultCollector
//!       ├── worker 0..N resolve handles → InvocationOutcome
//!       └── await_drain() once all rounds are issued
//! ```
//!
//! # Counting
//!
//! ```text
//! per      = baseline / iterations
//! leftover = baseline - per * iterations
//! count(i) = min((i + 1) * per [+ leftover if last], baseline)
//!          - jitter in [0, per / 2)      // only within the bypass window
//!          * target_count / baseline     // when the policy has a count
//!          max 1
//! ```

pub mod collector;
pub mod dispatcher;
pub mod plan;
pub mod policy;

pub use collector::{InvocationTask, ResultCollector};
pub use dispatcher::{DispatchReport, Dispatcher, STANDARD_STRATEGY};
pub use plan::IterationPlan;
pub use policy::{StaticCountPolicy, StaticPayloadBuilder};
