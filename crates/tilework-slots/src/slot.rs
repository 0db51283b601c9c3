//! One entry of the slot table and the outcomes of table operations.

use std::fmt;

use tilework_core::{PacketWriter, SlotId, TagStore};
use tilework_processor::{ProcessorState, TileProcessor};

/// A processor instance: shared state plus type-specific behavior.
///
/// Inactive slots keep their last occupant until a later placement
/// overwrites it.
pub struct Slot {
    /// Shared fields.
    pub state: ProcessorState,
    /// Type-specific behavior.
    pub behavior: Box<dyn TileProcessor>,
}

impl Slot {
    /// Pair a state with its behavior.
    pub fn new(state: ProcessorState, behavior: Box<dyn TileProcessor>) -> Self {
        Self { state, behavior }
    }

    /// Whether the slot holds a live instance.
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// The instance's clone payload.
    pub fn clone_payload(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        self.behavior.net_clone_send(&self.state, &mut w);
        w.into_bytes()
    }

    /// The instance's mod payload.
    pub fn data_payload(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        self.behavior.send_data(&self.state, &mut w);
        w.into_bytes()
    }

    /// The instance's persistent fields.
    pub fn save(&self) -> TagStore {
        let mut tag = TagStore::new();
        self.behavior.save_data(&self.state, &mut tag);
        tag
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.state, f)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Result of a successful placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// A new instance was spawned in this slot.
    Created(SlotId),
    /// An instance of the same type already held the position.
    Existing(SlotId),
}

impl Placement {
    /// The slot holding the instance.
    pub fn slot(self) -> SlotId {
        match self {
            Self::Created(s) | Self::Existing(s) => s,
        }
    }

    /// Whether a new instance was spawned.
    pub fn is_created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// What applying a replicated clone payload did locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicaOutcome {
    /// A new local instance was spawned to mirror the sender's.
    Spawned(SlotId),
    /// An existing live instance was updated in place.
    Updated(SlotId),
    /// The sender's instance is dead; the local one was killed.
    Killed(SlotId),
    /// The payload described a dead instance with no live local copy.
    Stale(SlotId),
}

impl ReplicaOutcome {
    /// The slot the payload addressed.
    pub fn slot(self) -> SlotId {
        match self {
            Self::Spawned(s) | Self::Updated(s) | Self::Killed(s) | Self::Stale(s) => s,
        }
    }
}
