//! Error types shared across the tilework workspace.
//!
//! Organized by subsystem: type registry, placement, processor hooks,
//! and the wire format used by the clone protocol.

use std::error::Error;
use std::fmt;

use crate::id::{ProcessorTypeId, SlotId, TilePos};

/// Errors from building or querying the type registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The same Rust type was registered twice.
    DuplicateType {
        /// Full `mod:Type` name of the duplicate.
        name: String,
    },
    /// A type that was never registered was queried.
    UnknownType {
        /// Rust type name of the query.
        name: String,
    },
    /// A numeric type ID outside `0..len` was queried.
    UnknownTypeId {
        /// The unrecognised ID.
        id: ProcessorTypeId,
    },
    /// A full `mod:Type` name that matches no registration.
    UnknownName {
        /// The unrecognised name.
        name: String,
    },
    /// More types than fit in a [`ProcessorTypeId`].
    TooManyTypes,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateType { name } => write!(f, "processor type '{name}' registered twice"),
            Self::UnknownType { name } => write!(f, "processor type '{name}' is not registered"),
            Self::UnknownTypeId { id } => write!(f, "no processor type with id {id}"),
            Self::UnknownName { name } => write!(f, "no processor type named '{name}'"),
            Self::TooManyTypes => write!(f, "processor type count exceeds u32::MAX"),
        }
    }
}

impl Error for RegistryError {}

/// Errors from placing a processor on a tile.
///
/// Placement errors never mutate the slot table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaceError {
    /// The type could not be resolved.
    Registry(RegistryError),
    /// The type's target tile is unset or the sentinel value.
    TargetTileUnset {
        /// The rejected type.
        type_id: ProcessorTypeId,
    },
    /// An active instance of a different type already occupies the position.
    PositionOccupied {
        /// The contested position.
        position: TilePos,
        /// Slot of the existing occupant.
        occupant: SlotId,
        /// Type of the existing occupant.
        occupant_type: ProcessorTypeId,
    },
    /// Every slot up to the configured maximum is active.
    CapacityExceeded {
        /// The configured maximum slot count.
        capacity: u32,
    },
    /// A non-authoritative peer only gains instances by replication.
    NotAuthoritative,
}

impl fmt::Display for PlaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::TargetTileUnset { type_id } => {
                write!(f, "processor type {type_id} has no target tile")
            }
            Self::PositionOccupied {
                position,
                occupant,
                occupant_type,
            } => write!(
                f,
                "position {position} is held by slot {occupant} of type {occupant_type}"
            ),
            Self::CapacityExceeded { capacity } => {
                write!(f, "slot table full ({capacity} active instances)")
            }
            Self::NotAuthoritative => write!(f, "peer is not authoritative"),
        }
    }
}

impl Error for PlaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for PlaceError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

/// Errors returned by a processor's own hooks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessorError {
    /// The hook failed; the instance is treated as dead on the next check.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A wire payload could not be read.
    Wire(WireError),
    /// The hook panicked; the panic was caught at the hook boundary.
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "hook failed: {reason}"),
            Self::Panicked { message } => write!(f, "hook panicked: {message}"),
            Self::Wire(e) => write!(f, "wire: {e}"),
        }
    }
}

impl Error for ProcessorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WireError> for ProcessorError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

/// Errors from reading the little-endian wire format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes remained than the read required.
    Truncated {
        /// Bytes the read needed.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },
    /// A boolean byte was neither 0 nor 1.
    InvalidBool {
        /// The byte found.
        byte: u8,
    },
    /// A length-prefixed string was not UTF-8.
    InvalidUtf8,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, remaining } => {
                write!(f, "truncated: needed {needed} bytes, {remaining} remaining")
            }
            Self::InvalidBool { byte } => write!(f, "invalid bool byte {byte:#04x}"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8 string"),
        }
    }
}

impl Error for WireError {}
