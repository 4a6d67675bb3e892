//! Strategy registry: explicit name → strategy map built at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use warm_core::*;
use warmgrid_autoscale::{HoldHintPayload, StatAwareScaler, STAT_AWARE_STRATEGY};
use warmgrid_dispatch::{Dispatcher, STANDARD_STRATEGY};

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyRef>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `standard` and `stat-aware` dispatchers, both
    /// built from `config` and sharing `invoker`.
    pub fn with_builtin(config: &WarmupConfig, invoker: Arc<dyn Invoker>) -> WarmupResult<Self> {
        let standard = Dispatcher::standard(config.clone(), invoker.clone())?;
        let stat_aware = Dispatcher::new(
            STAT_AWARE_STRATEGY,
            config.clone(),
            invoker,
            Box::new(StatAwareScaler::from_config(config)),
            Box::new(HoldHintPayload::new()),
        )?;

        let mut registry = Self::new();
        registry.register(Arc::new(standard));
        registry.register(Arc::new(stat_aware));
        Ok(registry)
    }

    /// Add a strategy under its own name, replacing any previous one.
    pub fn register(&mut self, strategy: StrategyRef) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn get(&self, name: &str) -> WarmupResult<StrategyRef> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| WarmupError::UnknownStrategy(name.to_string()))
    }

    /// The strategy configured as default, falling back to `standard`.
    pub fn default_strategy(&self, name: &str) -> WarmupResult<StrategyRef> {
        match self.strategies.get(name) {
            Some(strategy) => Ok(strategy.clone()),
            None => {
                info!(
                    requested = %name,
                    "no such warmup strategy, going on with the standard strategy"
                );
                self.get(STANDARD_STRATEGY)
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}
