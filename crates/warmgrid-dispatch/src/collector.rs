//! Result collector: resolves pending invocation handles in the background.
//!
//! A fixed pool of worker tasks pulls `InvocationTask`s from a shared
//! queue, awaits each handle, and appends the resulting
//! `InvocationOutcome`. The dispatch loop only enqueues; it never waits on
//! an individual invocation.
//!
//! ```text
//! dispatcher ──submit()──▶ queue ──▶ worker 0..N ──▶ outcomes
//!            ◀─await_drain()── outstanding == 0 (signalled by last worker)
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use warm_core::{
    InvocationCoordinates, InvocationFailure, InvocationHandle, InvocationOutcome, InvokeError,
};

/// A pending invocation waiting to be resolved.
pub struct InvocationTask {
    pub coordinates: InvocationCoordinates,
    pub handle: InvocationHandle,
}

/// State shared between the dispatcher and the workers.
struct Shared {
    /// Submitted tasks not yet resolved.
    outstanding: AtomicUsize,
    /// Signalled when `outstanding` drops to zero.
    drained: Notify,
    outcomes: StdMutex<Vec<InvocationOutcome>>,
}

impl Shared {
    fn push(&self, outcome: InvocationOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(outcome);
    }

    fn complete(&self, outcome: InvocationOutcome) {
        self.push(outcome);
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_one();
        }
    }
}

pub struct ResultCollector {
    sender: mpsc::UnboundedSender<InvocationTask>,
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl ResultCollector {
    /// Spawn `worker_count` workers (at least one).
    pub fn start(worker_count: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
            outcomes: StdMutex::new(Vec::new()),
        });

        let workers = (0..worker_count.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    receiver.clone(),
                    shared.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        Self {
            sender,
            shared,
            shutdown_tx,
            workers,
        }
    }

    /// Enqueue a pending invocation for resolution.
    pub fn submit(&self, task: InvocationTask) {
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        if let Err(mpsc::error::SendError(task)) = self.sender.send(task) {
            // Every worker is gone; the task can never be resolved.
            self.shared.complete(InvocationOutcome {
                coordinates: task.coordinates,
                result: Err(InvocationFailure::ResultRetrieval(InvokeError::Dropped)),
            });
        }
    }

    /// Record an outcome that never went through the queue.
    pub fn record(&self, outcome: InvocationOutcome) {
        self.shared.push(outcome);
    }

    /// Number of submitted tasks not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait until every submitted task has been resolved.
    ///
    /// There is no internal timeout; the caller's own deadline applies.
    pub async fn await_drain(&self) {
        loop {
            if self.outstanding() == 0 {
                return;
            }
            self.shared.drained.notified().await;
        }
    }

    /// Signal the workers to exit and return the collected outcomes.
    ///
    /// Anything still queued is discarded. Workers busy resolving a handle
    /// are not aborted; they exit after their current item.
    pub fn stop(self) -> Vec<InvocationOutcome> {
        let _ = self.shutdown_tx.send(true);
        drop(self.sender);
        debug!(workers = self.workers.len(), "result collector stopped");
        let mut outcomes = self
            .shared
            .outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *outcomes)
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<InvocationTask>>>,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let task = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                task = receiver.recv() => task,
            }
        };
        let Some(InvocationTask {
            coordinates,
            handle,
        }) = task
        else {
            break;
        };

        // Resolve on its own task so a panicking handle surfaces as a
        // failure instead of taking the worker down.
        let result = match tokio::spawn(handle).await {
            Ok(result) => result,
            Err(_) => Err(InvokeError::Dropped),
        };

        let result = match result {
            Ok(response) => {
                debug!(
                    worker,
                    iteration = coordinates.iteration,
                    invocation = coordinates.invocation,
                    function = %coordinates.function_name,
                    "invocation result retrieved"
                );
                Ok(response)
            }
            Err(e) => {
                error!(
                    worker,
                    iteration = coordinates.iteration,
                    invocation = coordinates.invocation,
                    function = %coordinates.function_name,
                    error = %e,
                    "retrieving invocation result failed"
                );
                Err(InvocationFailure::ResultRetrieval(e))
            }
        };

        shared.complete(InvocationOutcome {
            coordinates,
            result,
        });
    }
    debug!(worker, "result collector worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warm_core::InvokeResponse;

    fn coordinates(invocation: u32) -> InvocationCoordinates {
        InvocationCoordinates {
            iteration: 1,
            invocation,
            function_name: "orders".to_string(),
        }
    }

    fn ok_task(invocation: u32, delay_ms: u64) -> InvocationTask {
        InvocationTask {
            coordinates: coordinates(invocation),
            handle: Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok::<_, InvokeError>(InvokeResponse::with_payload(format!("r{invocation}")))
            }),
        }
    }

    fn failing_task(invocation: u32) -> InvocationTask {
        InvocationTask {
            coordinates: coordinates(invocation),
            handle: Box::pin(async {
                Err::<InvokeResponse, _>(InvokeError::Failed("no warmup".to_string()))
            }),
        }
    }

    async fn explode() -> Result<InvokeResponse, InvokeError> {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn drains_all_submitted_tasks() {
        let collector = ResultCollector::start(3);
        for i in 1..=10 {
            collector.submit(ok_task(i, u64::from(i % 3)));
        }

        collector.await_drain().await;
        assert_eq!(collector.outstanding(), 0);

        let outcomes = collector.stop();
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }

    #[tokio::test]
    async fn failures_are_recorded_not_thrown() {
        let collector = ResultCollector::start(2);
        collector.submit(ok_task(1, 0));
        collector.submit(failing_task(2));

        collector.await_drain().await;
        let outcomes = collector.stop();

        assert_eq!(outcomes.len(), 2);
        let failed: Vec<_> = outcomes.iter().filter(|o| o.is_failure()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].coordinates.invocation, 2);
        assert!(matches!(
            failed[0].result,
            Err(InvocationFailure::ResultRetrieval(InvokeError::Failed(_)))
        ));
    }

    #[tokio::test]
    async fn panicking_handle_becomes_failure() {
        let collector = ResultCollector::start(1);
        collector.submit(InvocationTask {
            coordinates: coordinates(1),
            handle: Box::pin(explode()),
        });
        collector.submit(ok_task(2, 0));

        collector.await_drain().await;
        let outcomes = collector.stop();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| matches!(
            o.result,
            Err(InvocationFailure::ResultRetrieval(InvokeError::Dropped))
        )));
    }

    #[tokio::test]
    async fn drain_with_nothing_submitted_returns_immediately() {
        let collector = ResultCollector::start(2);
        collector.await_drain().await;
        assert!(collector.stop().is_empty());
    }

    #[tokio::test]
    async fn recorded_outcomes_are_returned_without_queueing() {
        let collector = ResultCollector::start(1);
        collector.record(InvocationOutcome {
            coordinates: coordinates(1),
            result: Err(InvocationFailure::DispatchIssue(InvokeError::Rejected(
                "throttled".to_string(),
            ))),
        });

        assert_eq!(collector.outstanding(), 0);
        collector.await_drain().await;
        let outcomes = collector.stop();
        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn worker_count_is_at_least_one() {
        let collector = ResultCollector::start(0);
        assert_eq!(collector.worker_count(), 1);
        collector.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn resolves_concurrently_across_workers() {
        let collector = ResultCollector::start(4);
        let started = std::time::Instant::now();
        for i in 1..=4 {
            collector.submit(ok_task(i, 200));
        }
        collector.await_drain().await;

        // Four 200ms handles on four workers finish well under 800ms.
        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(collector.stop().len(), 4);
    }
}
