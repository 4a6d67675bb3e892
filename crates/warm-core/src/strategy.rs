//! Strategy and policy seams.
//!
//! A dispatcher is one baseline algorithm parameterized by two policies:
//! a `CountPolicy` that decides how many concurrent invocations a target
//! gets this round, and a `PayloadBuilder` that shapes what each of those
//! invocations carries. Both the static and the stat-aware variants
//! implement these same two traits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::WarmupResult;
use crate::types::{InvocationOutcome, WarmupTarget};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shared handle to a strategy. Identity (not name) decides routing.
pub type StrategyRef = Arc<dyn WarmupStrategy>;

/// A warmup dispatch policy the router can fan targets out to.
pub trait WarmupStrategy: Send + Sync {
    /// Unique name of this strategy.
    fn name(&self) -> &str;

    /// Warm up the given targets within `deadline_millis`.
    fn warmup(
        &self,
        deadline_millis: u64,
        targets: Vec<WarmupTarget>,
    ) -> BoxFuture<'_, WarmupResult<()>>;
}

/// Decides per-target invocation counts and learns from outcomes.
pub trait CountPolicy: Send {
    /// Invocation count for `target` this round.
    ///
    /// Calling this twice with no `ingest` in between returns the same value.
    fn invocation_count_for(
        &mut self,
        target: &str,
        default_count: u32,
        override_count: u32,
    ) -> u32;

    /// Feed back the outcomes of a completed dispatch run.
    fn ingest(&mut self, outcomes: &[InvocationOutcome]);
}

/// Builds the payload of every invocation of one target in one round.
pub trait PayloadBuilder: Send {
    /// Returns exactly `invocation_count` payloads; index `i` belongs to
    /// invocation number `i + 1`.
    fn payloads(&mut self, target: &WarmupTarget, invocation_count: u32) -> Vec<Bytes>;
}

/// The static count: a positive override wins, otherwise the baseline.
pub fn fallback_invocation_count(default_count: u32, override_count: u32) -> u32 {
    if override_count > 0 {
        override_count
    } else {
        default_count
    }
}

/// Returns `true` if both handles point at the same strategy instance.
pub fn same_strategy(a: &StrategyRef, b: &StrategyRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
