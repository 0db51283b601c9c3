//! Slot table configuration.

/// Capacity limits for a [`SlotTable`](crate::SlotTable).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotConfig {
    /// Maximum number of slots, live or stale.
    ///
    /// Default: 1000. Placement fails with `CapacityExceeded` once every
    /// slot is active, and replicas naming a slot at or beyond this bound
    /// are rejected.
    pub max_slots: u32,
}

impl SlotConfig {
    /// Default slot capacity.
    pub const DEFAULT_MAX_SLOTS: u32 = 1000;

    /// A config with the given capacity.
    pub fn new(max_slots: u32) -> Self {
        Self { max_slots }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SLOTS)
    }
}
