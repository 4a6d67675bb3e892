//! Warmup handler: the entry point of one warmup run.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use warm_core::*;

use crate::router::StrategyRouter;

pub struct WarmupHandler {
    router: StrategyRouter,
    deadline: Arc<dyn DeadlineProvider>,
}

impl WarmupHandler {
    pub fn new(router: StrategyRouter, deadline: Arc<dyn DeadlineProvider>) -> Self {
        info!(strategy = %router.default_strategy().name(), "using warmup strategy");
        Self { router, deadline }
    }

    pub fn router(&self) -> &StrategyRouter {
        &self.router
    }

    /// Warm up `targets` within the time the deadline provider reports.
    pub async fn run(&self, targets: Vec<WarmupTarget>) -> WarmupResult<()> {
        let deadline_millis = self.deadline.remaining_time_millis();
        let started = Instant::now();
        info!(
            targets = targets.len(),
            deadline_ms = deadline_millis,
            "warmup started"
        );

        let result = self.router.route(deadline_millis, targets).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(elapsed_ms, "warmup finished"),
            Err(e) => error!(elapsed_ms, error = %e, "warmup finished with errors"),
        }
        result
    }
}
