//! Test utilities and mock types for tilework development.
//!
//! Provides a HashMap-backed [`MockTiles`] world, a recording
//! [`MockDraw`] surface, the sample processors in [`fixtures`], and
//! [`sample_registry`] which registers all of them.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tilework_core::{
    DrawLayer, DrawTarget, ProcessorTypeId, SlotId, TileInfo, TilePos, TileQuery, TileTypeId,
};
use tilework_processor::{RegistryBuilder, TypeRegistry};

use fixtures::{Beacon, Faulty, Furnace, Hidden, Ticker};

pub const FURNACE_TILE: TileTypeId = TileTypeId(10);
pub const HIDDEN_TILE: TileTypeId = TileTypeId(11);
pub const FAULTY_TILE: TileTypeId = TileTypeId(12);
pub const TICKER_TILE: TileTypeId = TileTypeId(13);
/// A 2x1 structure.
pub const BEACON_TILE: TileTypeId = TileTypeId(20);

/// Install `env_logger` for the test binary. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Mock implementation of [`TileQuery`].
///
/// Positions never set report an empty tile. Positions outside
/// `bounds` (when set) report `None`.
#[derive(Clone, Debug, Default)]
pub struct MockTiles {
    tiles: HashMap<TilePos, TileTypeId>,
    structures: HashMap<TileTypeId, (u8, u8)>,
    bounds: Option<(TilePos, TilePos)>,
}

impl MockTiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world that knows the sample structure sizes.
    pub fn standard() -> Self {
        let mut tiles = Self::new();
        tiles.set_structure(BEACON_TILE, 2, 1);
        tiles
    }

    /// Declare the footprint of a structure tile type, in tiles.
    pub fn set_structure(&mut self, tile: TileTypeId, width: u8, height: u8) {
        self.structures.insert(tile, (width, height));
    }

    /// Limit the world to the inclusive rectangle `min..=max`.
    pub fn set_bounds(&mut self, min: TilePos, max: TilePos) {
        self.bounds = Some((min, max));
    }

    pub fn set(&mut self, pos: TilePos, tile: TileTypeId) {
        self.tiles.insert(pos, tile);
    }

    /// Fill a structure's whole footprint starting at `origin`.
    pub fn build(&mut self, origin: TilePos, tile: TileTypeId) {
        let (w, h) = self.structures.get(&tile).copied().unwrap_or((1, 1));
        for dy in 0..i16::from(h) {
            for dx in 0..i16::from(w) {
                self.set(origin.offset(dx, dy), tile);
            }
        }
    }

    /// Mine a single tile.
    pub fn clear(&mut self, pos: TilePos) {
        self.tiles.remove(&pos);
    }

    /// Every set position, for world-load scans.
    pub fn positions(&self) -> Vec<TilePos> {
        let mut out: Vec<TilePos> = self.tiles.keys().copied().collect();
        out.sort();
        out
    }
}

impl TileQuery for MockTiles {
    fn tile_at(&self, pos: TilePos) -> Option<TileInfo> {
        if let Some((min, max)) = self.bounds {
            if pos.x < min.x || pos.y < min.y || pos.x > max.x || pos.y > max.y {
                return None;
            }
        }
        Some(
            self.tiles
                .get(&pos)
                .map_or(TileInfo::empty(), |&t| TileInfo::solid(t)),
        )
    }

    fn structure_size(&self, tile: TileTypeId) -> Option<(u8, u8)> {
        self.structures.get(&tile).copied()
    }
}

/// Mock implementation of [`DrawTarget`] that records every call.
#[derive(Debug, Default)]
pub struct MockDraw {
    /// Layers begun, in order.
    pub layers: Vec<DrawLayer>,
    /// `(layer, slot)` for each hook that drew.
    pub calls: Vec<(DrawLayer, SlotId)>,
}

impl MockDraw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, layer: DrawLayer, slot: SlotId) {
        self.calls.push((layer, slot));
    }
}

impl DrawTarget for MockDraw {
    fn begin_layer(&mut self, layer: DrawLayer) {
        self.layers.push(layer);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// IDs of the sample processors in a registry built by [`sample_registry`].
pub struct SampleTypes {
    pub registry: Arc<TypeRegistry>,
    pub furnace: ProcessorTypeId,
    pub beacon: ProcessorTypeId,
    pub hidden: ProcessorTypeId,
    pub faulty: ProcessorTypeId,
    pub ticker: ProcessorTypeId,
}

/// Register every fixture under mod `"sample"`, in a fixed order.
pub fn sample_registry() -> SampleTypes {
    let mut b = RegistryBuilder::new();
    let furnace = b.register::<Furnace>("sample").expect("register Furnace");
    let beacon = b.register::<Beacon>("sample").expect("register Beacon");
    let hidden = b.register::<Hidden>("sample").expect("register Hidden");
    let faulty = b.register::<Faulty>("sample").expect("register Faulty");
    let ticker = b.register::<Ticker>("sample").expect("register Ticker");
    SampleTypes {
        registry: Arc::new(b.build()),
        furnace,
        beacon,
        hidden,
        faulty,
        ticker,
    }
}
