//! Bounded queue of structural changes applied at the start of a tick.
//!
//! Network receive paths and host world events must not mutate the slot
//! table mid-tick. They push a [`StructuralChange`] instead; the session
//! drains the queue in arrival order before updating instances.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use tilework_core::{PeerId, ProcessorTypeId, SlotId, SourceItem, TilePos};

/// A deferred mutation of the slot table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StructuralChange {
    /// Spawn an instance.
    Place {
        /// Type to spawn.
        type_id: ProcessorTypeId,
        /// Origin tile.
        position: TilePos,
        /// Placing item, if any.
        source_item: Option<SourceItem>,
    },
    /// Kill the instance whose origin is `position`.
    KillAt {
        /// Origin tile.
        position: TilePos,
    },
    /// A sub-tile of a multi-tile structure was destroyed.
    KillSubTile {
        /// The destroyed tile.
        position: TilePos,
    },
    /// Apply a replicated clone payload.
    ApplyClone {
        /// Sender's type ID.
        type_id: ProcessorTypeId,
        /// Output of `net_clone_send`.
        payload: Vec<u8>,
    },
    /// Deliver a mod payload to an instance's `receive_data`.
    ModPayload {
        /// Type the sender addressed.
        type_id: ProcessorTypeId,
        /// Slot the sender addressed.
        slot: SlotId,
        /// Originating peer.
        sender: PeerId,
        /// Mod-defined bytes.
        data: Vec<u8>,
    },
}

/// Errors from [`PendingQueue::push`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingError {
    /// The queue already holds `capacity` changes.
    QueueFull {
        /// The queue's capacity.
        capacity: usize,
    },
}

impl fmt::Display for PendingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull { capacity } => {
                write!(f, "pending queue full ({capacity} changes)")
            }
        }
    }
}

impl Error for PendingError {}

/// FIFO of structural changes with a hard capacity.
pub struct PendingQueue {
    queue: VecDeque<StructuralChange>,
    capacity: usize,
    rejected: u64,
}

impl PendingQueue {
    /// Create a queue holding at most `capacity` changes.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
            rejected: 0,
        }
    }

    /// Append a change, or reject it if the queue is full.
    pub fn push(&mut self, change: StructuralChange) -> Result<(), PendingError> {
        if self.queue.len() >= self.capacity {
            self.rejected += 1;
            return Err(PendingError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(change);
        Ok(())
    }

    /// Take every queued change in arrival order.
    pub fn drain(&mut self) -> Vec<StructuralChange> {
        self.queue.drain(..).collect()
    }

    /// Number of queued changes.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued changes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cumulative pushes rejected because the queue was full.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Discard all queued changes.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kill(x: i16) -> StructuralChange {
        StructuralChange::KillAt {
            position: TilePos::new(x, 0),
        }
    }

    #[test]
    fn drains_in_arrival_order() {
        let mut q = PendingQueue::new(4);
        for x in [3, 1, 2] {
            q.push(kill(x)).unwrap();
        }
        assert_eq!(q.drain(), vec![kill(3), kill(1), kill(2)]);
        assert!(q.is_empty());
    }

    #[test]
    fn full_queue_rejects_and_counts() {
        let mut q = PendingQueue::new(2);
        q.push(kill(0)).unwrap();
        q.push(kill(1)).unwrap();
        assert_eq!(q.push(kill(2)), Err(PendingError::QueueFull { capacity: 2 }));
        assert_eq!(q.rejected(), 1);
        assert_eq!(q.len(), 2);
        q.drain();
        assert!(q.push(kill(2)).is_ok());
    }
}
