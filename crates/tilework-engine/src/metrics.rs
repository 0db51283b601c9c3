//! Per-tick counters for the tick driver.

use tilework_core::TickId;

/// Counters and timing collected during a single [`Session::step`](crate::Session::step).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// The tick these counters describe.
    pub tick: TickId,
    /// Wall-clock time for the whole step, in microseconds.
    pub total_us: u64,
    /// Pending structural changes drained this tick.
    pub pending_applied: u32,
    /// Instances whose `update` ran.
    pub updated: u32,
    /// Instances killed by the dead-check.
    pub killed: u32,
    /// Instances whose `update` failed or panicked this tick, plus shared
    /// instances whose `single_instance_update` panicked.
    pub faulted: u32,
    /// Faulted instances skipped while awaiting an authoritative kill.
    pub suspended: u32,
    /// Instances whose `update` was skipped because the focus was beyond
    /// their idle distance.
    pub idle: u32,
    /// Types whose `single_instance_update` ran.
    pub single_updates: u32,
    /// Clone payloads applied from the pending queue.
    pub replicas_applied: u32,
    /// Inbound changes that could not be applied (logged as desyncs).
    pub desyncs: u32,
    /// Sync events added to the outbox this tick.
    pub events_emitted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TickMetrics::default();
        assert_eq!(m.tick, TickId(0));
        assert_eq!(m.total_us, 0);
        assert_eq!(m.updated + m.killed + m.faulted + m.desyncs, 0);
    }
}
