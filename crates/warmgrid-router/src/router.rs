//! Strategy router: partitions targets by strategy and runs each bucket
//! on its own task.

use tracing::{debug, error, info};

use warm_core::*;

/// One strategy and the targets routed to it.
struct Bucket {
    strategy: StrategyRef,
    targets: Vec<WarmupTarget>,
}

pub struct StrategyRouter {
    default: StrategyRef,
}

impl StrategyRouter {
    pub fn new(default: StrategyRef) -> Self {
        Self { default }
    }

    pub fn default_strategy(&self) -> &StrategyRef {
        &self.default
    }

    /// Warm up `targets`, each with its own strategy or the default one.
    ///
    /// Every non-empty bucket runs concurrently and all of them are awaited
    /// before returning. If any bucket failed, the error is a
    /// `CompositeStrategyError` holding each bucket's error.
    pub async fn route(
        &self,
        deadline_millis: u64,
        targets: Vec<WarmupTarget>,
    ) -> WarmupResult<()> {
        let buckets = self.partition(targets);
        info!(
            default = %self.default.name(),
            buckets = buckets.len(),
            deadline_ms = deadline_millis,
            "routing warmup targets"
        );

        let handles: Vec<_> = buckets
            .into_iter()
            .map(|Bucket { strategy, targets }| {
                let name = strategy.name().to_string();
                debug!(strategy = %name, targets = targets.len(), "spawning strategy bucket");
                let handle =
                    tokio::spawn(async move { strategy.warmup(deadline_millis, targets).await });
                (name, handle)
            })
            .collect();

        let mut failures = Vec::new();
        for (strategy, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(WarmupError::TaskFailed(e.to_string())),
            };
            if let Err(error) = result {
                error!(strategy = %strategy, error = %error, "strategy bucket failed");
                failures.push(StrategyFailure { strategy, error });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CompositeStrategyError::new(failures).into())
        }
    }

    /// Group targets by strategy identity; the default bucket comes first.
    fn partition(&self, targets: Vec<WarmupTarget>) -> Vec<Bucket> {
        let mut defaults = Vec::new();
        let mut others: Vec<Bucket> = Vec::new();

        for target in targets {
            let assigned = target
                .strategy
                .clone()
                .filter(|strategy| !same_strategy(strategy, &self.default));
            let Some(strategy) = assigned else {
                defaults.push(target);
                continue;
            };
            match others.iter_mut().find(|b| same_strategy(&b.strategy, &strategy)) {
                Some(bucket) => bucket.targets.push(target),
                None => others.push(Bucket {
                    strategy,
                    targets: vec![target],
                }),
            }
        }

        let mut buckets = Vec::with_capacity(others.len() + 1);
        if !defaults.is_empty() {
            buckets.push(Bucket {
                strategy: self.default.clone(),
                targets: defaults,
            });
        }
        buckets.extend(others);
        buckets
    }
}

impl WarmupStrategy for StrategyRouter {
    fn name(&self) -> &str {
        self.default.name()
    }

    fn warmup(
        &self,
        deadline_millis: u64,
        targets: Vec<WarmupTarget>,
    ) -> BoxFuture<'_, WarmupResult<()>> {
        Box::pin(self.route(deadline_millis, targets))
    }
}
