//! Traits through which the core reaches the host game.
//!
//! The core never owns or mutates world tiles. It reads them through
//! [`TileQuery`] and hands an opaque [`DrawTarget`] to draw hooks.

use std::any::Any;

use crate::id::{TilePos, TileTypeId};

/// What the host world reports for one tile position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileInfo {
    /// Whether a solid tile is present (an empty cell reports `false`).
    pub has_tile: bool,
    /// The tile's type; meaningless when `has_tile` is `false`.
    pub tile_type: TileTypeId,
}

impl TileInfo {
    /// A present tile of the given type.
    pub fn solid(tile_type: TileTypeId) -> Self {
        Self {
            has_tile: true,
            tile_type,
        }
    }

    /// An empty cell.
    pub fn empty() -> Self {
        Self {
            has_tile: false,
            tile_type: TileTypeId::SENTINEL,
        }
    }

    /// Whether this tile is present and of type `tile_type`.
    pub fn is(&self, tile_type: TileTypeId) -> bool {
        self.has_tile && self.tile_type == tile_type
    }
}

/// Read-only view of the host's tile world.
///
/// Implementations must be cheap to call: the tick driver queries every
/// active instance's tile each step.
pub trait TileQuery {
    /// The tile at `pos`, or `None` if the position is outside the world.
    fn tile_at(&self, pos: TilePos) -> Option<TileInfo>;

    /// Width and height in tiles of the structure built from `tile_type`.
    ///
    /// `None` means the tile is a plain 1x1 tile.
    fn structure_size(&self, tile_type: TileTypeId) -> Option<(u8, u8)> {
        let _ = tile_type;
        None
    }
}

/// Draw layers, in the order the host paints them.
///
/// The host draws its own tiles between [`DrawLayer::Back`] and
/// [`DrawLayer::Main`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DrawLayer {
    /// Before anything tile-related.
    PreTile,
    /// Behind the host's tiles.
    Back,
    /// In front of the host's tiles.
    Main,
    /// Above everything else.
    Front,
}

impl DrawLayer {
    /// All layers in paint order.
    pub const ORDER: [DrawLayer; 4] = [
        DrawLayer::PreTile,
        DrawLayer::Back,
        DrawLayer::Main,
        DrawLayer::Front,
    ];
}

/// Opaque rendering surface handed to draw hooks.
///
/// The core only forwards it; processors reach the host's concrete
/// surface through [`as_any_mut`](DrawTarget::as_any_mut).
pub trait DrawTarget {
    /// Called by the draw pass before a layer's hooks run.
    fn begin_layer(&mut self, layer: DrawLayer) {
        let _ = layer;
    }

    /// The concrete surface, for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
