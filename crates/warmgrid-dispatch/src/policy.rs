//! Static count policy and payload builder used by the `standard` strategy.

use bytes::Bytes;

use warm_core::{
    fallback_invocation_count, CountPolicy, InvocationOutcome, PayloadBuilder, WarmupTarget,
};

/// Uses the target's override when positive, otherwise the baseline.
/// Learns nothing from outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCountPolicy;

impl CountPolicy for StaticCountPolicy {
    fn invocation_count_for(
        &mut self,
        _target: &str,
        default_count: u32,
        override_count: u32,
    ) -> u32 {
        fallback_invocation_count(default_count, override_count)
    }

    fn ingest(&mut self, _outcomes: &[InvocationOutcome]) {}
}

/// Sends the target's invocation data verbatim, or an empty payload.
///
/// Targets warmed this way must accept empty messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPayloadBuilder;

impl PayloadBuilder for StaticPayloadBuilder {
    fn payloads(&mut self, target: &WarmupTarget, invocation_count: u32) -> Vec<Bytes> {
        let payload = target
            .invocation_data
            .as_deref()
            .filter(|data| !data.is_empty())
            .map(|data| Bytes::copy_from_slice(data.as_bytes()))
            .unwrap_or_default();
        vec![payload; invocation_count as usize]
    }
}
