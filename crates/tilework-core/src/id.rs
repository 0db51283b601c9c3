//! Strongly-typed identifiers and the peer [`Authority`] role.

use std::fmt;

/// Identifies a registered processor type.
///
/// Types are registered once while mods load and assigned dense,
/// sequential IDs. `ProcessorTypeId(n)` corresponds to the n-th
/// registration in the type registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorTypeId(pub u32);

impl fmt::Display for ProcessorTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessorTypeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Index of an instance in a peer's slot table.
///
/// Stable for the lifetime of one instance within one running session.
/// A later instance may reuse the slot after the previous occupant died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u32);

impl SlotId {
    /// The slot as a table index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// The type of a tile in the host world.
///
/// `TileTypeId(0)` is reserved as the "no processor" sentinel: a
/// processor whose target tile is the sentinel is never placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTypeId(pub u16);

impl TileTypeId {
    /// Sentinel value that never qualifies for a processor.
    pub const SENTINEL: TileTypeId = TileTypeId(0);

    /// Whether this is the sentinel value.
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

impl fmt::Display for TileTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer tile coordinate in the host world.
///
/// For multi-tile structures this is the top-left tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePos {
    /// Column.
    pub x: i16,
    /// Row.
    pub y: i16,
}

impl TilePos {
    /// Construct a tile position.
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Offset by a number of tiles, saturating at the coordinate range.
    pub fn offset(self, dx: i16, dy: i16) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identifies a connected peer on the network channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u16);

impl PeerId {
    /// Conventional id of the authoritative peer (server or host).
    pub const AUTHORITY: PeerId = PeerId(u16::MAX);
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing tick counter.
///
/// Incremented each time the session advances one simulation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Which role this peer plays in a session.
///
/// Passed explicitly into the tick driver and every processor context
/// instead of being queried from global state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Authority {
    /// Single-player: owns the world and has nobody to replicate to.
    #[default]
    Standalone,
    /// Multiplayer server: owns lifecycle decisions and replicates them.
    Server,
    /// Multiplayer client: mirrors the server's decisions.
    Client,
}

impl Authority {
    /// Whether this peer may decide that an instance is dead.
    pub fn is_authoritative(self) -> bool {
        !matches!(self, Self::Client)
    }

    /// Whether this peer replicates state to others.
    pub fn replicates(self) -> bool {
        matches!(self, Self::Server)
    }
}

/// The item that placed a processor's tile.
///
/// Opaque to the core; carried so hooks can inspect it during spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceItem {
    /// Host item type.
    pub item_type: u32,
    /// Stack size at placement time.
    pub stack: u16,
}
