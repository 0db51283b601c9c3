//! Benchmark profiles and utilities for the tilework processor framework.
//!
//! - [`GridTiles`]: a dense tile grid, cheaper to query than a hash map.
//! - [`Pulse`]: a processor with a small clone payload and a cheap update.
//! - [`bench_registry`] and [`populated_session`]: ready-made sessions.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use tilework_core::{
    Authority, PacketReader, PacketWriter, ProcessorError, ProcessorTypeId, TileInfo, TilePos,
    TileQuery, TileTypeId, WireError,
};
use tilework_engine::{Session, SessionConfig};
use tilework_processor::{
    ProcessorContext, ProcessorState, RegistryBuilder, TileProcessor, TypeRegistry,
};

/// Tile type every [`GridTiles`] cell holds.
pub const PULSE_TILE: TileTypeId = TileTypeId(1);

/// A `width` x `height` grid starting at the origin, every cell a
/// [`PULSE_TILE`]. Cells can be mined.
pub struct GridTiles {
    width: i16,
    height: i16,
    cells: Vec<bool>,
}

impl GridTiles {
    /// A fully built grid.
    pub fn new(width: i16, height: i16) -> Self {
        let len = usize::try_from(i32::from(width) * i32::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![true; len],
        }
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        usize::try_from(i32::from(pos.y) * i32::from(self.width) + i32::from(pos.x)).ok()
    }

    /// Remove the tile at `pos`.
    pub fn mine(&mut self, pos: TilePos) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = false;
        }
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| TilePos::new(x, y)))
    }
}

impl TileQuery for GridTiles {
    fn tile_at(&self, pos: TilePos) -> Option<TileInfo> {
        let i = self.index(pos)?;
        Some(if self.cells[i] {
            TileInfo::solid(PULSE_TILE)
        } else {
            TileInfo::empty()
        })
    }
}

/// Counts ticks and replicates the count.
#[derive(Clone, Debug, Default)]
pub struct Pulse {
    /// Updates run.
    pub count: u32,
}

impl TileProcessor for Pulse {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(PULSE_TILE)
    }

    fn duplicate(&self) -> Option<Box<dyn TileProcessor>> {
        Some(Box::new(self.clone()))
    }

    fn update(&mut self, ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
        self.count = self.count.wrapping_add(1);
        if self.count % 64 == 0 {
            ctx.request_sync();
        }
        Ok(())
    }

    fn net_clone_send(&self, state: &ProcessorState, w: &mut PacketWriter) {
        state.write_clone_header(w);
        w.write_u32(self.count);
    }

    fn net_clone_read(
        &mut self,
        state: &mut ProcessorState,
        r: &mut PacketReader<'_>,
    ) -> Result<(), WireError> {
        state.read_clone_header(r)?;
        self.count = r.read_u32()?;
        Ok(())
    }
}

/// A registry holding only [`Pulse`], and its type ID.
pub fn bench_registry() -> (Arc<TypeRegistry>, ProcessorTypeId) {
    let mut b = RegistryBuilder::new();
    let id = b.register::<Pulse>("bench").unwrap();
    (Arc::new(b.build()), id)
}

/// A session with a [`Pulse`] on every tile of a `width` x `height` grid.
pub fn populated_session(width: i16, height: i16, authority: Authority) -> (Session, GridTiles) {
    let (registry, _) = bench_registry();
    let tiles = GridTiles::new(width, height);
    let mut config = SessionConfig::new(authority);
    config.max_slots = u32::try_from(i32::from(width) * i32::from(height))
        .unwrap_or(1)
        .max(1);
    config.max_pending = config.max_pending.max(config.max_slots as usize);
    let mut session = Session::new(registry, config).unwrap();
    let positions: Vec<TilePos> = tiles.positions().collect();
    session.load_world(&tiles, positions);
    (session, tiles)
}
