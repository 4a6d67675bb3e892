//! Warmup error types.
//!
//! Individual invocation failures are collected as `InvocationFailure`
//! values and only surface at the end of a run, either through an
//! `AggregateWarmupError` built by a dispatcher or a
//! `CompositeStrategyError` built by the router.

use std::fmt;

use thiserror::Error;

use crate::types::InvocationCoordinates;

/// Failure reported by the `Invoker` collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("invocation rejected: {0}")]
    Rejected(String),

    #[error("invocation failed: {0}")]
    Failed(String),

    #[error("invocation handle dropped before completion")]
    Dropped,
}

/// Why a single warmup invocation did not produce a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationFailure {
    /// Issuing the invocation itself failed.
    #[error("dispatch issue: {0}")]
    DispatchIssue(InvokeError),

    /// Resolving the pending handle failed.
    #[error("result retrieval: {0}")]
    ResultRetrieval(InvokeError),
}

/// One failed invocation, with the coordinates it was issued under.
#[derive(Debug, Clone)]
pub struct FailedInvocation {
    pub coordinates: InvocationCoordinates,
    pub failure: InvocationFailure,
}

/// Every failure recorded during one dispatcher run.
#[derive(Debug, Clone)]
pub struct AggregateWarmupError {
    pub strategy: String,
    pub failures: Vec<FailedInvocation>,
}

impl fmt::Display for AggregateWarmupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[ERRORS]")?;
        for (i, failed) in self.failures.iter().enumerate() {
            writeln!(f, "\t- Error [{}]", i + 1)?;
            writeln!(f, "\t\t- Iteration  No: {}", failed.coordinates.iteration)?;
            writeln!(f, "\t\t- Invocation No: {}", failed.coordinates.invocation)?;
            writeln!(f, "\t\t- Function Name: {}", failed.coordinates.function_name)?;
            writeln!(f, "\t\t- Error        : {}", failed.failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateWarmupError {}

/// A strategy bucket that failed during routing.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: WarmupError,
}

/// Failures of every strategy bucket of one routing call.
///
/// Each bucket's original error is kept as its own sub-error.
#[derive(Debug)]
pub struct CompositeStrategyError {
    failures: Vec<StrategyFailure>,
}

impl CompositeStrategyError {
    pub fn new(failures: Vec<StrategyFailure>) -> Self {
        Self { failures }
    }

    pub fn sub_errors(&self) -> &[StrategyFailure] {
        &self.failures
    }

    pub fn into_sub_errors(self) -> Vec<StrategyFailure> {
        self.failures
    }
}

impl fmt::Display for CompositeStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error occurred while warming up: {} strategy bucket(s) failed",
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n- [{}] {}", failure.strategy, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeStrategyError {}

/// Errors surfaced by warmup runs.
#[derive(Debug, Error)]
pub enum WarmupError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown warmup strategy: {0}")]
    UnknownStrategy(String),

    #[error("{0}")]
    Aggregate(#[from] AggregateWarmupError),

    #[error("{0}")]
    Composite(#[from] CompositeStrategyError),

    #[error("warmup task failed: {0}")]
    TaskFailed(String),
}

pub type WarmupResult<T> = Result<T, WarmupError>;
