//! Hold-hint payloads for stat-aware warmup rounds.
//!
//! Every invocation asks the warmed function to hold on for an extra
//! `100ms` per ten concurrent invocations, so the round's requests overlap
//! and land on distinct instances. One randomly chosen invocation per
//! round asks for ten times that, keeping one instance busy while the rest
//! cycle.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use warm_core::{PayloadBuilder, WarmupTarget};

/// Extra hold time per ten concurrent invocations.
pub const HOLD_STEP_MILLIS: u32 = 100;
/// Multiplier applied to the one long-held invocation.
pub const LONG_HOLD_MULTIPLIER: u32 = 10;

/// Render a `#warmup wait=<millis>` control message.
pub fn hold_hint(wait_millis: u32) -> String {
    format!("#warmup wait={wait_millis}")
}

pub struct HoldHintPayload {
    rng: StdRng,
}

impl HoldHintPayload {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for HoldHintPayload {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuilder for HoldHintPayload {
    fn payloads(&mut self, _target: &WarmupTarget, invocation_count: u32) -> Vec<Bytes> {
        if invocation_count == 0 {
            return Vec::new();
        }
        let (wait, long_wait) = round_waits(invocation_count);
        let long_hold = self.rng.gen_range(1..=invocation_count);

        (1..=invocation_count)
            .map(|invocation| {
                let wait = if invocation == long_hold { long_wait } else { wait };
                Bytes::from(hold_hint(wait))
            })
            .collect()
    }
}

/// Regular and long hold times for a round of `invocation_count` calls.
fn round_waits(invocation_count: u32) -> (u32, u32) {
    let wait = HOLD_STEP_MILLIS.saturating_mul(invocation_count / 10);
    (wait, wait.saturating_mul(LONG_HOLD_MULTIPLIER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(payloads: &[Bytes]) -> Vec<&str> {
        payloads
            .iter()
            .map(|p| std::str::from_utf8(p).unwrap())
            .collect()
    }

    #[test]
    fn exactly_one_invocation_holds_longer() {
        let mut builder = HoldHintPayload::with_seed(11);
        let payloads = builder.payloads(&WarmupTarget::new("f"), 25);
        let hints = hints(&payloads);

        assert_eq!(hints.len(), 25);
        assert_eq!(hints.iter().filter(|h| **h == "#warmup wait=2000").count(), 1);
        assert_eq!(hints.iter().filter(|h| **h == "#warmup wait=200").count(), 24);
    }

    #[test]
    fn small_rounds_hold_for_zero_extra() {
        let mut builder = HoldHintPayload::with_seed(3);
        let payloads = builder.payloads(&WarmupTarget::new("f"), 4);
        assert!(hints(&payloads).iter().all(|h| *h == "#warmup wait=0"));
    }

    #[test]
    fn long_hold_index_varies_across_rounds() {
        let mut builder = HoldHintPayload::with_seed(99);
        let target = WarmupTarget::new("f");
        let positions: std::collections::HashSet<usize> = (0..50)
            .map(|_| {
                let payloads = builder.payloads(&target, 10);
                hints(&payloads)
                    .iter()
                    .position(|h| *h == "#warmup wait=1000")
                    .unwrap()
            })
            .collect();
        assert!(positions.len() > 1);
    }

    #[test]
    fn hold_times_saturate_for_huge_rounds() {
        assert_eq!(round_waits(25), (200, 2000));
        assert_eq!(round_waits(u32::MAX), (u32::MAX, u32::MAX));
        assert_eq!(round_waits(500_000_000), (u32::MAX, u32::MAX));
    }

    #[test]
    fn zero_invocations_builds_nothing() {
        let mut builder = HoldHintPayload::default();
        assert!(builder.payloads(&WarmupTarget::new("f"), 0).is_empty());
    }
}
