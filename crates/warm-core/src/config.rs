//! Warmup configuration.
//!
//! Every option has a default, so an empty TOML document is a valid
//! configuration. Keys use the camelCase names operators already know
//! (`invocationCount`, `iterationCount`, ...).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WarmupError, WarmupResult};

pub const DEFAULT_STRATEGY: &str = "standard";
pub const DEFAULT_INVOCATION_COUNT: u32 = 8;
pub const DEFAULT_ITERATION_COUNT: u32 = 2;
pub const DEFAULT_RANDOMIZATION_BYPASS_INTERVAL_MILLIS: u64 = 15 * 60 * 1000;
pub const DEFAULT_FUNCTION_INSTANCE_IDLE_TIME_MILLIS: u64 = 30 * 60 * 1000;
pub const DEFAULT_WARMUP_SCALE_FACTOR: f64 = 2.0;
/// Upper bound on `warmupScaleFactor`; scaled counts stay well inside `u32`.
pub const MAX_WARMUP_SCALE_FACTOR: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WarmupConfig {
    /// Name of the default dispatch strategy.
    pub strategy: String,
    /// Total invocations per function across all iterations.
    pub invocation_count: u32,
    /// Number of result collector workers.
    pub result_consumer_count: u32,
    pub iteration_count: u32,
    /// Run one iteration per call and persist a cursor across calls.
    pub enable_split_iterations: bool,
    pub randomization_bypass_interval_millis: u64,
    pub disable_randomization: bool,
    /// Qualifier used when a target has no alias of its own.
    pub warmup_function_alias: Option<String>,
    /// When true, failures are only logged. When false, they are raised.
    pub throw_error_on_failure: bool,
    pub dont_wait_between_invocation_rounds: bool,
    pub function_instance_idle_time_millis: u64,
    pub warmup_scale_factor: f64,
    pub disable_warmup_scale: bool,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            invocation_count: DEFAULT_INVOCATION_COUNT,
            result_consumer_count: default_result_consumer_count(),
            iteration_count: DEFAULT_ITERATION_COUNT,
            enable_split_iterations: false,
            randomization_bypass_interval_millis: DEFAULT_RANDOMIZATION_BYPASS_INTERVAL_MILLIS,
            disable_randomization: false,
            warmup_function_alias: None,
            throw_error_on_failure: false,
            dont_wait_between_invocation_rounds: false,
            function_instance_idle_time_millis: DEFAULT_FUNCTION_INSTANCE_IDLE_TIME_MILLIS,
            warmup_scale_factor: DEFAULT_WARMUP_SCALE_FACTOR,
            disable_warmup_scale: false,
        }
    }
}

impl WarmupConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> WarmupResult<Self> {
        let config: WarmupConfig =
            toml::from_str(content).map_err(|e| WarmupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> WarmupResult<()> {
        if self.iteration_count == 0 {
            return Err(WarmupError::Config(
                "iterationCount must be greater than zero".to_string(),
            ));
        }
        if self.invocation_count == 0 {
            return Err(WarmupError::Config(
                "invocationCount must be greater than zero".to_string(),
            ));
        }
        if self.result_consumer_count == 0 {
            return Err(WarmupError::Config(
                "resultConsumerCount must be greater than zero".to_string(),
            ));
        }
        if !self.warmup_scale_factor.is_finite() || self.warmup_scale_factor <= 0.0 {
            return Err(WarmupError::Config(format!(
                "warmupScaleFactor must be a positive number, got {}",
                self.warmup_scale_factor
            )));
        }
        if self.warmup_scale_factor > MAX_WARMUP_SCALE_FACTOR {
            return Err(WarmupError::Config(format!(
                "warmupScaleFactor must be at most {MAX_WARMUP_SCALE_FACTOR}, got {}",
                self.warmup_scale_factor
            )));
        }
        Ok(())
    }

    /// The dispatcher-wide alias, ignoring blank values.
    pub fn fallback_alias(&self) -> Option<&str> {
        self.warmup_function_alias
            .as_deref()
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
    }
}

fn default_result_consumer_count() -> u32 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * cpus) as u32
}
