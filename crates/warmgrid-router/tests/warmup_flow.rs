//! End-to-end warmup runs through the handler, router, registry and the
//! built-in dispatchers against a fake invoker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use warm_core::*;
use warmgrid_router::{FixedDeadline, StrategyRegistry, StrategyRouter, WarmupHandler};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Serves every function from a fixed number of instances, round-robin
/// per function, and reports activity telemetry in each response.
struct FleetInvoker {
    instances: usize,
    failing: Vec<&'static str>,
    next: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl FleetInvoker {
    fn new(instances: usize) -> Arc<Self> {
        Self::failing(instances, Vec::new())
    }

    fn failing(instances: usize, failing: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            instances,
            failing,
            next: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn take_requests(&self) -> Vec<InvokeRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

impl Invoker for FleetInvoker {
    fn invoke_async(&self, request: InvokeRequest) -> Result<InvocationHandle, InvokeError> {
        let fails = self.failing.contains(&request.function_name.as_str());
        let instance = {
            let mut next = self.next.lock().unwrap();
            let counter = next.entry(request.function_name.clone()).or_default();
            *counter += 1;
            *counter % self.instances
        };
        let body = serde_json::json!({
            "instanceId": format!("{}-{instance}", request.function_name),
            "latestRequestTime": now_millis(),
        })
        .to_string();
        self.requests.lock().unwrap().push(request);

        Ok(Box::pin(async move {
            if fails {
                Err(InvokeError::Failed("function timed out".to_string()))
            } else {
                Ok(InvokeResponse::with_payload(body))
            }
        }))
    }
}

fn config() -> WarmupConfig {
    WarmupConfig {
        iteration_count: 1,
        result_consumer_count: 4,
        disable_randomization: true,
        dont_wait_between_invocation_rounds: true,
        ..Default::default()
    }
}

fn counts(requests: &[InvokeRequest]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for request in requests {
        *counts.entry(request.function_name.clone()).or_default() += 1;
    }
    counts
}

#[tokio::test]
async fn stat_aware_targets_scale_from_reported_activity() {
    init_tracing();
    let invoker = FleetInvoker::new(3);
    let registry = StrategyRegistry::with_builtin(&config(), invoker.clone()).unwrap();
    let standard = registry.default_strategy("standard").unwrap();
    let stat_aware = registry.get("stat-aware").unwrap();
    let handler =
        WarmupHandler::new(StrategyRouter::new(standard), Arc::new(FixedDeadline(2000)));

    let targets = || {
        vec![
            WarmupTarget::new("orders"),
            WarmupTarget::new("billing").with_strategy(stat_aware.clone()),
        ]
    };

    // First run: no activity yet, both use the baseline.
    handler.run(targets()).await.unwrap();
    let first = invoker.take_requests();
    let first_counts = counts(&first);
    assert_eq!(first_counts["orders"], 8);
    assert_eq!(first_counts["billing"], 8);

    let billing_hints: Vec<_> = first
        .iter()
        .filter(|r| r.function_name == "billing")
        .map(|r| String::from_utf8(r.payload.to_vec()).unwrap())
        .collect();
    assert!(billing_hints.iter().all(|h| h.starts_with("#warmup wait=")));
    assert!(first
        .iter()
        .filter(|r| r.function_name == "orders")
        .all(|r| r.payload.is_empty()));

    // Second run: billing reported 3 live instances, scaled by 2.0.
    handler.run(targets()).await.unwrap();
    let second_counts = counts(&invoker.take_requests());
    assert_eq!(second_counts["orders"], 8);
    assert_eq!(second_counts["billing"], 6);
}

#[tokio::test]
async fn bucket_failures_surface_with_invocation_detail() {
    init_tracing();
    let invoker = FleetInvoker::failing(2, vec!["billing"]);
    let registry = StrategyRegistry::with_builtin(&config(), invoker.clone()).unwrap();
    let router = StrategyRouter::new(registry.default_strategy("standard").unwrap());
    let handler = WarmupHandler::new(router, Arc::new(FixedDeadline(2000)));

    let err = handler
        .run(vec![
            WarmupTarget::new("orders"),
            WarmupTarget::new("billing").with_strategy(registry.get("stat-aware").unwrap()),
        ])
        .await
        .unwrap_err();

    let WarmupError::Composite(composite) = err else {
        panic!("expected composite error");
    };
    let sub_errors = composite.sub_errors();
    assert_eq!(sub_errors.len(), 1);
    assert_eq!(sub_errors[0].strategy, "stat-aware");

    let report = sub_errors[0].error.to_string();
    assert!(report.contains("[ERRORS]"));
    assert!(report.contains("Function Name: billing"));
    assert!(report.contains("function timed out"));
}

#[tokio::test]
async fn swallowed_failures_do_not_fail_the_run() {
    init_tracing();
    let invoker = FleetInvoker::failing(2, vec!["orders"]);
    let config = WarmupConfig {
        throw_error_on_failure: true,
        ..config()
    };
    let registry = StrategyRegistry::with_builtin(&config, invoker.clone()).unwrap();
    let router = StrategyRouter::new(registry.default_strategy(&config.strategy).unwrap());
    let handler = WarmupHandler::new(router, Arc::new(FixedDeadline(2000)));

    handler.run(vec![WarmupTarget::new("orders")]).await.unwrap();
    assert_eq!(counts(&invoker.take_requests())["orders"], 8);
}

#[tokio::test]
async fn split_iterations_advance_across_runs() {
    init_tracing();
    let invoker = FleetInvoker::new(1);
    let config = WarmupConfig {
        iteration_count: 4,
        enable_split_iterations: true,
        ..config()
    };
    let registry = StrategyRegistry::with_builtin(&config, invoker.clone()).unwrap();
    let handler = WarmupHandler::new(
        StrategyRouter::new(registry.get("standard").unwrap()),
        Arc::new(FixedDeadline(1000)),
    );

    let mut per_run = Vec::new();
    for _ in 0..5 {
        handler.run(vec![WarmupTarget::new("orders")]).await.unwrap();
        per_run.push(invoker.take_requests().len());
    }
    assert_eq!(per_run, vec![2, 4, 6, 8, 2]);
}
