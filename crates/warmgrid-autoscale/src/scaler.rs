//! Adaptive scaler: sizes warmup rounds from observed instance activity.
//!
//! Warmed functions may answer a warmup invocation with a small JSON body
//! naming the instance that served it and when that instance last handled
//! real traffic. The scaler keeps the most recent sample per instance and,
//! once a function has samples, warms it with
//! `max(round(active_instances * scale_factor), 1)` concurrent invocations
//! instead of the configured count.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, error, info};

use warm_core::{fallback_invocation_count, CountPolicy, InvocationOutcome, WarmupConfig};

/// Timestamp layout of `latestRequestTime` when sent as text.
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Activity telemetry carried by a successful warmup response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityReport {
    instance_id: Option<String>,
    #[serde(alias = "lastRequestTime")]
    latest_request_time: Option<RequestTime>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestTime {
    Millis(i64),
    Text(String),
}

impl RequestTime {
    /// Epoch milliseconds, or `None` if unparseable.
    fn epoch_millis(&self) -> Option<i64> {
        match self {
            RequestTime::Millis(ms) => Some(*ms),
            RequestTime::Text(text) => parse_request_time(text),
        }
    }
}

/// Error body of a response that carries a function error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport {
    error_message: Option<String>,
}

pub struct StatAwareScaler {
    /// function name → instance id → last real request (epoch ms).
    activity: HashMap<String, HashMap<String, u64>>,
    idle_time_millis: u64,
    scale_factor: f64,
    disabled: bool,
}

impl StatAwareScaler {
    pub fn new(idle_time_millis: u64, scale_factor: f64, disabled: bool) -> Self {
        Self {
            activity: HashMap::new(),
            idle_time_millis,
            scale_factor,
            disabled,
        }
    }

    pub fn from_config(config: &WarmupConfig) -> Self {
        Self::new(
            config.function_instance_idle_time_millis,
            config.warmup_scale_factor,
            config.disable_warmup_scale,
        )
    }

    /// Record that `instance_id` of `function` served real traffic at
    /// `request_time` (epoch ms).
    pub fn record_activity(&mut self, function: &str, instance_id: &str, request_time: u64) {
        self.activity
            .entry(function.to_string())
            .or_default()
            .insert(instance_id.to_string(), request_time);
    }

    /// Instances of `function` with a sample on record, expired or not.
    pub fn tracked_instances(&self, function: &str) -> usize {
        self.activity.get(function).map_or(0, HashMap::len)
    }

    pub fn invocation_count_at(
        &mut self,
        now_millis: u64,
        target: &str,
        default_count: u32,
        override_count: u32,
    ) -> u32 {
        if self.disabled {
            let count = fallback_invocation_count(default_count, override_count);
            info!(
                function = %target,
                count,
                "scaling disabled, using standard invocation count"
            );
            return count;
        }

        let idle = self.idle_time_millis;
        let Some(instances) = self.activity.get_mut(target) else {
            let count = fallback_invocation_count(default_count, override_count);
            debug!(
                function = %target,
                count,
                "no activity recorded, using standard invocation count"
            );
            return count;
        };

        instances.retain(|_, last_request| !is_expired(now_millis, *last_request, idle));
        let active = instances.len();
        let count = ((active as f64 * self.scale_factor).round() as u32).max(1);
        info!(
            function = %target,
            active_instances = active,
            scale_factor = self.scale_factor,
            count,
            "scaled invocation count from instance activity"
        );
        count
    }

    pub fn ingest_at(&mut self, now_millis: u64, outcomes: &[InvocationOutcome]) {
        for outcome in outcomes {
            let function = &outcome.coordinates.function_name;
            let Ok(response) = &outcome.result else {
                continue;
            };

            if let Some(function_error) = response.function_error.as_deref() {
                let message = serde_json::from_slice::<ErrorReport>(&response.payload)
                    .ok()
                    .and_then(|report| report.error_message)
                    .unwrap_or_else(|| function_error.to_string());
                error!(
                    function = %function,
                    error = %message,
                    "warmup invocation returned with error"
                );
                continue;
            }

            if response.payload.is_empty() {
                continue;
            }
            let report = match serde_json::from_slice::<ActivityReport>(&response.payload) {
                Ok(report) => report,
                Err(e) => {
                    debug!(function = %function, error = %e, "ignoring non-telemetry response");
                    continue;
                }
            };

            let (Some(instance_id), Some(request_time)) =
                (report.instance_id, report.latest_request_time)
            else {
                continue;
            };
            match request_time.epoch_millis() {
                Some(ms) if ms > 0 => self.record_activity(function, &instance_id, ms as u64),
                Some(_) => {}
                None => debug!(
                    function = %function,
                    instance = %instance_id,
                    "ignoring unparseable request time"
                ),
            }
        }

        self.evict_expired(now_millis);
        debug!(functions = self.activity.len(), "ingested warmup telemetry");
    }

    fn evict_expired(&mut self, now_millis: u64) {
        let idle = self.idle_time_millis;
        for instances in self.activity.values_mut() {
            instances.retain(|_, last_request| !is_expired(now_millis, *last_request, idle));
        }
    }
}

impl CountPolicy for StatAwareScaler {
    fn invocation_count_for(
        &mut self,
        target: &str,
        default_count: u32,
        override_count: u32,
    ) -> u32 {
        self.invocation_count_at(epoch_millis(), target, default_count, override_count)
    }

    fn ingest(&mut self, outcomes: &[InvocationOutcome]) {
        self.ingest_at(epoch_millis(), outcomes);
    }
}

fn is_expired(now_millis: u64, last_request: u64, idle_time_millis: u64) -> bool {
    now_millis > last_request.saturating_add(idle_time_millis)
}

/// Parse a `yyyy-MM-dd HH:mm:ss.SSS` (UTC) or RFC 3339 timestamp.
fn parse_request_time(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, REQUEST_TIME_FORMAT) {
        return Some(naive.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
