//! Errors from applying replicated instance state.

use std::error::Error;
use std::fmt;

use tilework_core::{RegistryError, SlotId, WireError};

/// Errors from [`SlotTable::apply_replica`](crate::SlotTable::apply_replica).
///
/// All of these are desyncs: the session logs them and moves on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyError {
    /// The payload names a type this peer does not have.
    Registry(RegistryError),
    /// The payload could not be decoded.
    Wire(WireError),
    /// The payload names a slot beyond the table's capacity.
    SlotOutOfRange {
        /// Slot from the payload header.
        slot: SlotId,
        /// This table's `max_slots`.
        capacity: u32,
    },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
            Self::SlotOutOfRange { slot, capacity } => {
                write!(f, "slot {slot} out of range (capacity {capacity})")
            }
        }
    }
}

impl Error for ApplyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::Wire(e) => Some(e),
            Self::SlotOutOfRange { .. } => None,
        }
    }
}

impl From<RegistryError> for ApplyError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<WireError> for ApplyError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}
