//! warmgrid-autoscale: activity-driven warmup scaling.
//!
//! Hot functions get more concurrent warmup invocations, idle ones fewer.
//! Warmed functions report which instance served a warmup call and when
//! that instance last handled real traffic; the scaler turns those
//! samples into an active instance estimate per function.
//!
//! # Scaling Algorithm
//!
//! ```text
//! no samples for function or scaling disabled:
//!     count = override > 0 ? override : baseline
//!
//! otherwise:
//!     evict samples older than function_instance_idle_time
//!     count = max(round(active_instances * warmup_scale_factor), 1)
//! ```
//!
//! The stat-aware strategy pairs `StatAwareScaler` with
//! `HoldHintPayload`, which asks one invocation per round to hold its
//! instance ten times longer than the others.

pub mod payload;
pub mod scaler;

pub use payload::{hold_hint, HoldHintPayload};
pub use scaler::{StatAwareScaler, REQUEST_TIME_FORMAT};

/// Registry name of the stat-aware strategy.
pub const STAT_AWARE_STRATEGY: &str = "stat-aware";
