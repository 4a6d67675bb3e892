//! Dispatcher: drives warmup iterations across a wall-clock budget.
//!
//! One `dispatch` call:
//!
//! 1. Builds an `IterationPlan` from the remaining time and the baseline.
//! 2. For each iteration and each target, computes an invocation count
//!    (randomized down after the first dispatch, rescaled by the count
//!    policy, never below 1), issues that many non-blocking invocations
//!    and hands every pending handle to the `ResultCollector`.
//! 3. Sleeps out the rest of the iteration's slice between rounds.
//! 4. Waits for the collector to drain, feeds the outcomes to the count
//!    policy, and aggregates failures.
//!
//! In split-iteration mode a call runs a single iteration and a cursor
//! carries the next iteration index over to the following call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use warm_core::*;

use crate::collector::{InvocationTask, ResultCollector};
use crate::plan::{randomized_count, rescale, IterationPlan};
use crate::policy::{StaticCountPolicy, StaticPayloadBuilder};

pub const STANDARD_STRATEGY: &str = "standard";

/// What one `dispatch` call did.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// 1-based numbers of the iterations that ran.
    pub iterations: Vec<u32>,
    /// Invocations issued per target across those iterations.
    pub issued: HashMap<String, u32>,
    pub outcomes: Vec<InvocationOutcome>,
}

impl DispatchReport {
    pub fn failures(&self) -> Vec<FailedInvocation> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.result {
                Err(failure) => Some(FailedInvocation {
                    coordinates: outcome.coordinates.clone(),
                    failure: failure.clone(),
                }),
                Ok(_) => None,
            })
            .collect()
    }

    pub fn issued_for(&self, target: &str) -> u32 {
        self.issued.get(target).copied().unwrap_or(0)
    }
}

/// Mutable state that outlives a single iteration.
struct DispatchState {
    /// First dispatch time per target inside the current bypass window.
    last_dispatch: HashMap<String, Instant>,
    /// Next iteration index in split-iteration mode.
    cursor: u32,
    count_policy: Box<dyn CountPolicy>,
    payload_builder: Box<dyn PayloadBuilder>,
    rng: StdRng,
}

pub struct Dispatcher {
    name: String,
    config: WarmupConfig,
    invoker: Arc<dyn Invoker>,
    state: Mutex<DispatchState>,
}

impl Dispatcher {
    /// Create a dispatcher with the given policies.
    ///
    /// Fails if the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        config: WarmupConfig,
        invoker: Arc<dyn Invoker>,
        count_policy: Box<dyn CountPolicy>,
        payload_builder: Box<dyn PayloadBuilder>,
    ) -> WarmupResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            invoker,
            state: Mutex::new(DispatchState {
                last_dispatch: HashMap::new(),
                cursor: 0,
                count_policy,
                payload_builder,
                rng: StdRng::from_entropy(),
            }),
        })
    }

    /// The `standard` strategy: static counts and static payloads.
    pub fn standard(config: WarmupConfig, invoker: Arc<dyn Invoker>) -> WarmupResult<Self> {
        Self::new(
            STANDARD_STRATEGY,
            config,
            invoker,
            Box::new(StaticCountPolicy),
            Box::new(StaticPayloadBuilder),
        )
    }

    /// Seed the jitter source, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.state.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WarmupConfig {
        &self.config
    }

    /// Iteration index the next split-mode call will run.
    pub async fn cursor(&self) -> u32 {
        self.state.lock().await.cursor
    }

    /// Run warmup iterations for `targets` within `deadline_millis`.
    ///
    /// Invocation failures never abort the run. Once everything has
    /// drained they are aggregated: with `throw_error_on_failure` set the
    /// report is only logged, otherwise it is returned as an error.
    pub async fn dispatch(
        &self,
        deadline_millis: u64,
        targets: &[WarmupTarget],
    ) -> WarmupResult<DispatchReport> {
        if targets.is_empty() {
            debug!(strategy = %self.name, "no targets to warm up");
            return Ok(DispatchReport::default());
        }

        let mut state = self.state.lock().await;
        let plan = IterationPlan::new(
            deadline_millis,
            self.config.invocation_count,
            self.config.iteration_count,
        );
        let split = self.config.enable_split_iterations;
        let first_iteration = if split { state.cursor % plan.iteration_count } else { 0 };

        info!(
            strategy = %self.name,
            default_invocation_count = plan.baseline_count,
            iteration_count = plan.iteration_count,
            first_iteration = first_iteration + 1,
            deadline_ms = deadline_millis,
            targets = targets.len(),
            "starting warmup iterations"
        );

        let collector = ResultCollector::start(self.config.result_consumer_count as usize);
        let mut report = DispatchReport::default();

        for iteration in first_iteration..plan.iteration_count {
            let round_started = Instant::now();
            info!(strategy = %self.name, iteration = iteration + 1, "iteration round starting");

            for target in targets {
                let count = self.invocation_count(&mut state, &plan, iteration, target);
                let issued = self.issue(&mut state, &collector, iteration + 1, target, count);
                *report.issued.entry(target.name.clone()).or_default() += issued;
                state
                    .last_dispatch
                    .entry(target.name.clone())
                    .or_insert_with(Instant::now);
            }
            report.iterations.push(iteration + 1);

            if split {
                state.cursor = (iteration + 1) % plan.iteration_count;
                debug!(strategy = %self.name, next = state.cursor + 1, "split iteration done");
                break;
            }

            if !plan.is_last(iteration) && !self.config.dont_wait_between_invocation_rounds {
                let remaining = plan.slice.saturating_sub(round_started.elapsed());
                if remaining > Duration::ZERO {
                    info!(
                        strategy = %self.name,
                        sleep_ms = remaining.as_millis() as u64,
                        "sleeping until next iteration"
                    );
                    tokio::time::sleep(remaining).await;
                }
            }
        }

        info!(
            strategy = %self.name,
            outstanding = collector.outstanding(),
            "finished iterations, waiting for invocation results"
        );
        collector.await_drain().await;
        report.outcomes = collector.stop();

        state.count_policy.ingest(&report.outcomes);
        drop(state);

        info!(
            strategy = %self.name,
            outcomes = report.outcomes.len(),
            "finished waiting for invocation results"
        );

        self.handle_failures(&report)?;
        Ok(report)
    }

    /// Invocation count for one target in one iteration.
    fn invocation_count(
        &self,
        state: &mut DispatchState,
        plan: &IterationPlan,
        iteration: u32,
        target: &WarmupTarget,
    ) -> u32 {
        let mut count = plan.running_count(iteration);

        let bypass = Duration::from_millis(self.config.randomization_bypass_interval_millis);
        let within_window = state
            .last_dispatch
            .get(&target.name)
            .is_some_and(|at| at.elapsed() <= bypass);
        if !within_window {
            // First dispatch, or after a long pause: never randomize down.
            state.last_dispatch.remove(&target.name);
        } else if !self.config.disable_randomization {
            count = randomized_count(count, plan.per_iteration_count, &mut state.rng);
        }

        let target_count = state.count_policy.invocation_count_for(
            &target.name,
            plan.baseline_count,
            target.invocation_count,
        );
        if target_count > 0 {
            count = rescale(count, target_count, plan.baseline_count);
        }

        count.max(1)
    }

    /// Issue `count` invocations of `target`; returns how many were issued.
    fn issue(
        &self,
        state: &mut DispatchState,
        collector: &ResultCollector,
        iteration: u32,
        target: &WarmupTarget,
        count: u32,
    ) -> u32 {
        let alias = target
            .alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .or_else(|| self.config.fallback_alias());

        match alias {
            Some(alias) => info!(
                strategy = %self.name,
                function = %target.name,
                %alias,
                count,
                "invoking function to warm up"
            ),
            None => info!(
                strategy = %self.name,
                function = %target.name,
                count,
                "invoking function to warm up"
            ),
        }

        let payloads = state.payload_builder.payloads(target, count);
        let mut issued = 0;
        for (index, payload) in payloads.into_iter().enumerate() {
            let coordinates = InvocationCoordinates {
                iteration,
                invocation: index as u32 + 1,
                function_name: target.name.clone(),
            };
            let request = InvokeRequest {
                function_name: target.name.clone(),
                qualifier: alias.map(str::to_string),
                payload,
            };

            match self.invoker.invoke_async(request) {
                Ok(handle) => collector.submit(InvocationTask {
                    coordinates,
                    handle,
                }),
                Err(e) => {
                    warn!(
                        strategy = %self.name,
                        function = %target.name,
                        iteration,
                        invocation = coordinates.invocation,
                        error = %e,
                        "issuing warmup invocation failed"
                    );
                    collector.record(InvocationOutcome {
                        coordinates,
                        result: Err(InvocationFailure::DispatchIssue(e)),
                    });
                }
            }
            issued += 1;
        }
        issued
    }

    fn handle_failures(&self, report: &DispatchReport) -> WarmupResult<()> {
        let failures = report.failures();
        if failures.is_empty() {
            return Ok(());
        }

        let err = AggregateWarmupError {
            strategy: self.name.clone(),
            failures,
        };
        // The flag is inverted relative to its name: `true` swallows.
        if self.config.throw_error_on_failure {
            error!(strategy = %self.name, failures = err.failures.len(), "{err}");
            Ok(())
        } else {
            Err(err.into())
        }
    }
}

impl WarmupStrategy for Dispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(
        &self,
        deadline_millis: u64,
        targets: Vec<WarmupTarget>,
    ) -> BoxFuture<'_, WarmupResult<()>> {
        Box::pin(async move {
            self.dispatch(deadline_millis, &targets).await.map(|_| ())
        })
    }
}
