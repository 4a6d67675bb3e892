//! Core types shared across the warmup crates.

use std::fmt;

use bytes::Bytes;

use crate::error::InvocationFailure;
use crate::strategy::StrategyRef;

/// A function to keep warm, with its per-function configuration.
///
/// Supplied by whatever discovers targets; immutable for the duration of
/// one warmup run.
#[derive(Clone)]
pub struct WarmupTarget {
    /// Function identifier passed to the invoker.
    pub name: String,
    /// Qualifier to invoke with. Overrides the dispatcher-wide alias.
    pub alias: Option<String>,
    /// Strategy assigned to this function. `None` means the router's default.
    pub strategy: Option<StrategyRef>,
    /// Invocation count override. Zero means "use the baseline".
    pub invocation_count: u32,
    /// Payload sent with standard warmup invocations.
    pub invocation_data: Option<String>,
}

impl WarmupTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            strategy: None,
            invocation_count: 0,
            invocation_data: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyRef) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_invocation_count(mut self, count: u32) -> Self {
        self.invocation_count = count;
        self
    }

    pub fn with_invocation_data(mut self, data: impl Into<String>) -> Self {
        self.invocation_data = Some(data.into());
        self
    }
}

impl fmt::Debug for WarmupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmupTarget")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("strategy", &self.strategy.as_ref().map(|s| s.name().to_string()))
            .field("invocation_count", &self.invocation_count)
            .field("invocation_data", &self.invocation_data)
            .finish()
    }
}

/// A single invocation request handed to the invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub function_name: String,
    pub qualifier: Option<String>,
    pub payload: Bytes,
}

/// The decoded response of a completed invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeResponse {
    /// Set when the function itself reported an error (the call succeeded).
    pub function_error: Option<String>,
    pub payload: Bytes,
}

impl InvokeResponse {
    pub fn with_payload(payload: impl Into<Bytes>) -> Self {
        Self {
            function_error: None,
            payload: payload.into(),
        }
    }
}

/// Where an invocation sits within a run: (iteration, invocation, target).
///
/// Iteration and invocation numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvocationCoordinates {
    pub iteration: u32,
    pub invocation: u32,
    pub function_name: String,
}

impl fmt::Display for InvocationCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {} invocation {} of {}",
            self.iteration, self.invocation, self.function_name
        )
    }
}

/// The terminal result of one warmup invocation.
#[derive(Debug)]
pub struct InvocationOutcome {
    pub coordinates: InvocationCoordinates,
    pub result: Result<InvokeResponse, InvocationFailure>,
}

impl InvocationOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}
