//! Iteration plan: how a run's invocations are spread over its deadline.
//!
//! The per-iteration count is cumulative: iteration `i` (0-based) plans
//! `(i + 1) * per_iteration_count` invocations, clamped to the baseline,
//! and the final iteration also receives the leftover so it reaches the
//! baseline exactly. Concurrency therefore ramps up round by round instead
//! of hitting every instance at once.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationPlan {
    pub deadline_millis: u64,
    pub iteration_count: u32,
    /// Wall-clock time budget of one iteration.
    pub slice: Duration,
    /// Configured total invocations per target.
    pub baseline_count: u32,
    pub per_iteration_count: u32,
    /// Added to the final iteration only.
    pub leftover: u32,
}

impl IterationPlan {
    pub fn new(deadline_millis: u64, baseline_count: u32, iteration_count: u32) -> Self {
        let iteration_count = iteration_count.max(1);
        let per_iteration_count = baseline_count / iteration_count;
        let leftover = baseline_count - per_iteration_count * iteration_count;
        Self {
            deadline_millis,
            iteration_count,
            slice: Duration::from_millis(deadline_millis / u64::from(iteration_count)),
            baseline_count,
            per_iteration_count,
            leftover,
        }
    }

    /// Planned invocation count of a 0-based iteration, before any
    /// randomization or per-target scaling.
    pub fn running_count(&self, iteration: u32) -> u32 {
        let mut count = (iteration + 1).saturating_mul(self.per_iteration_count);
        if self.is_last(iteration) {
            count = count.saturating_add(self.leftover);
        }
        count.min(self.baseline_count)
    }

    pub fn is_last(&self, iteration: u32) -> bool {
        iteration + 1 == self.iteration_count
    }
}

/// Subtract a uniform jitter in `[0, per_iteration_count / 2)` from the
/// planned count. A zero-width range leaves the count untouched.
pub fn randomized_count<R: Rng + ?Sized>(
    running_count: u32,
    per_iteration_count: u32,
    rng: &mut R,
) -> u32 {
    let bound = per_iteration_count / 2;
    if bound == 0 {
        return running_count;
    }
    running_count.saturating_sub(rng.gen_range(0..bound))
}

/// Rescale a planned count from the baseline to a target-specific count.
pub fn rescale(running_count: u32, target_count: u32, baseline_count: u32) -> u32 {
    if baseline_count == 0 {
        return running_count;
    }
    let scaled = f64::from(running_count) * f64::from(target_count) / f64::from(baseline_count);
    scaled.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn plan_splits_baseline_and_leftover() {
        let plan = IterationPlan::new(2000, 8, 3);
        assert_eq!(plan.per_iteration_count, 2);
        assert_eq!(plan.leftover, 2);
        assert_eq!(plan.slice, Duration::from_millis(666));
        assert_eq!(
            plan.per_iteration_count * plan.iteration_count + plan.leftover,
            plan.baseline_count
        );
    }

    #[test]
    fn running_count_is_cumulative_and_reaches_baseline() {
        let plan = IterationPlan::new(2000, 8, 3);
        assert_eq!(plan.running_count(0), 2);
        assert_eq!(plan.running_count(1), 4);
        assert_eq!(plan.running_count(2), 8);
    }

    #[test]
    fn single_iteration_runs_full_baseline() {
        let plan = IterationPlan::new(2000, 8, 1);
        assert_eq!(plan.running_count(0), 8);
        assert!(plan.is_last(0));
    }

    #[test]
    fn baseline_smaller_than_iterations() {
        let plan = IterationPlan::new(1000, 2, 4);
        assert_eq!(plan.per_iteration_count, 0);
        assert_eq!(plan.leftover, 2);
        assert_eq!(plan.running_count(0), 0);
        assert_eq!(plan.running_count(3), 2);
    }

    #[test]
    fn plan_invariant_holds_for_many_shapes() {
        for baseline in 1..40 {
            for iterations in 1..10 {
                let plan = IterationPlan::new(10_000, baseline, iterations);
                assert_eq!(
                    plan.per_iteration_count * plan.iteration_count + plan.leftover,
                    baseline
                );
                assert_eq!(plan.running_count(iterations - 1), baseline);
            }
        }
    }

    #[test]
    fn randomized_count_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for per in 1..20u32 {
            for _ in 0..200 {
                let running = per * 3;
                let count = randomized_count(running, per, &mut rng);
                assert!(count <= running);
                assert!(running - count < (per / 2).max(1));
                assert!(count >= per.div_ceil(2));
            }
        }
    }

    #[test]
    fn randomized_count_without_range_is_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(randomized_count(5, 1, &mut rng), 5);
        assert_eq!(randomized_count(5, 0, &mut rng), 5);
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        assert_eq!(rescale(8, 6, 8), 6);
        assert_eq!(rescale(4, 3, 8), 2);
        assert_eq!(rescale(3, 3, 8), 1);
        assert_eq!(rescale(1, 1, 8), 0);
        assert_eq!(rescale(8, 20, 8), 20);
    }
}
