//! warm-core: shared types and seams for the warmup engine.
//!
//! Everything the dispatch, autoscale and router crates agree on lives
//! here: the target and outcome types, the collaborator traits
//! (`Invoker`, `DeadlineProvider`), the policy traits a dispatcher is
//! parameterized by (`CountPolicy`, `PayloadBuilder`), the
//! `WarmupStrategy` contract the router fans out over, configuration,
//! and the error taxonomy.

pub mod config;
pub mod error;
pub mod invoker;
pub mod strategy;
pub mod types;

pub use config::WarmupConfig;
pub use error::*;
pub use invoker::{DeadlineProvider, InvocationHandle, Invoker};
pub use strategy::{
    fallback_invocation_count, same_strategy, BoxFuture, CountPolicy, PayloadBuilder, StrategyRef,
    WarmupStrategy,
};
pub use types::*;
