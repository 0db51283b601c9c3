//! Reusable processor fixtures.
//!
//! - [`Furnace`]: custom clone, save, and mod-payload fields.
//! - [`Beacon`]: 2x1 multi-tile structure that records sub-tile kills and draws.
//! - [`Hidden`]: opts out of join-sync.
//! - [`Faulty`]: `update` always fails.
//! - [`Ticker`]: counts per-instance and per-type updates.

use tilework_core::{
    DrawLayer, DrawTarget, PacketReader, PacketWriter, PeerId, ProcessorError, TagStore, TagValue,
    TileTypeId, WireError,
};
use tilework_processor::{ProcessorContext, ProcessorState, TileProcessor, TypeContext};

use crate::{MockDraw, BEACON_TILE, FAULTY_TILE, FURNACE_TILE, HIDDEN_TILE, TICKER_TILE};

/// Burns one unit of fuel per tick while lit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Furnace {
    pub fuel: i32,
    pub lit: bool,
    /// Last peer that sent a payload.
    pub last_sender: Option<PeerId>,
}

impl TileProcessor for Furnace {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(FURNACE_TILE)
    }

    fn duplicate(&self) -> Option<Box<dyn TileProcessor>> {
        Some(Box::new(self.clone()))
    }

    fn update(&mut self, ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
        if self.lit && self.fuel > 0 {
            self.fuel -= 1;
            if self.fuel == 0 {
                self.lit = false;
                ctx.request_sync();
            }
        }
        Ok(())
    }

    fn net_clone_send(&self, state: &ProcessorState, w: &mut PacketWriter) {
        state.write_clone_header(w);
        w.write_i32(self.fuel);
        w.write_bool(self.lit);
    }

    fn net_clone_read(
        &mut self,
        state: &mut ProcessorState,
        r: &mut PacketReader<'_>,
    ) -> Result<(), WireError> {
        state.read_clone_header(r)?;
        self.fuel = r.read_i32()?;
        self.lit = r.read_bool()?;
        Ok(())
    }

    fn send_data(&self, _state: &ProcessorState, w: &mut PacketWriter) {
        w.write_i32(self.fuel);
    }

    fn receive_data(
        &mut self,
        _state: &mut ProcessorState,
        r: &mut PacketReader<'_>,
        sender: PeerId,
    ) -> Result<(), ProcessorError> {
        self.fuel = r.read_i32()?;
        self.lit = self.fuel > 0;
        self.last_sender = Some(sender);
        Ok(())
    }

    fn save_data(&self, _state: &ProcessorState, tag: &mut TagStore) {
        tag.set("fuel", TagValue::Int(self.fuel));
        tag.set("lit", TagValue::Bool(self.lit));
    }

    fn load_data(
        &mut self,
        _state: &mut ProcessorState,
        tag: &TagStore,
    ) -> Result<(), ProcessorError> {
        self.fuel = tag.get_int("fuel").ok_or_else(|| ProcessorError::Failed {
            reason: "missing fuel".into(),
        })?;
        self.lit = tag.get_bool("lit").unwrap_or(false);
        Ok(())
    }
}

/// A 2x1 structure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Beacon {
    /// Sub-tile offsets passed to `on_kill_multi_tile`.
    pub broken_frames: Vec<(i16, i16)>,
    pub spawn_order: Vec<&'static str>,
}

impl Beacon {
    fn mark(state: &ProcessorState, layer: DrawLayer, target: &mut dyn DrawTarget) {
        if let Some(rec) = target.as_any_mut().downcast_mut::<MockDraw>() {
            rec.record(layer, state.slot);
        }
    }
}

impl TileProcessor for Beacon {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(BEACON_TILE)
    }

    fn set_property(&mut self, _ctx: &mut ProcessorContext<'_>) {
        self.spawn_order.push("set_property");
    }

    fn initialize(&mut self, _ctx: &mut ProcessorContext<'_>) {
        self.spawn_order.push("initialize");
    }

    fn on_kill_multi_tile(&mut self, _state: &mut ProcessorState, frame_x: i16, frame_y: i16) {
        self.broken_frames.push((frame_x, frame_y));
    }

    fn pre_tile_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        Self::mark(state, DrawLayer::PreTile, target);
    }

    fn back_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        Self::mark(state, DrawLayer::Back, target);
    }

    fn draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        Self::mark(state, DrawLayer::Main, target);
    }

    fn front_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        Self::mark(state, DrawLayer::Front, target);
    }
}

/// Excluded from join-sync snapshots.
#[derive(Clone, Debug, Default)]
pub struct Hidden;

impl TileProcessor for Hidden {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(HIDDEN_TILE)
    }

    fn set_property(&mut self, ctx: &mut ProcessorContext<'_>) {
        ctx.state_mut().send_join_data = false;
    }
}

/// Fails every update.
#[derive(Clone, Debug, Default)]
pub struct Faulty {
    pub attempts: u32,
}

impl TileProcessor for Faulty {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(FAULTY_TILE)
    }

    fn update(&mut self, _ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
        self.attempts += 1;
        Err(ProcessorError::Failed {
            reason: "overheated".into(),
        })
    }
}

/// Counts updates.
#[derive(Clone, Debug, Default)]
pub struct Ticker {
    pub updates: u32,
    /// Incremented only on the type's shared instance.
    pub shared_ticks: u32,
    /// Live count seen by the last `single_instance_update`.
    pub last_live: u32,
    pub loaded: bool,
    pub unloaded: bool,
}

impl TileProcessor for Ticker {
    fn target_tile(&self) -> Option<TileTypeId> {
        Some(TICKER_TILE)
    }

    fn update(&mut self, _ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
        self.updates += 1;
        Ok(())
    }

    fn single_instance_update(&mut self, ctx: &TypeContext<'_>) {
        self.shared_ticks += 1;
        self.last_live = ctx.live_count;
    }

    fn load_in_world(&mut self, _ctx: &mut ProcessorContext<'_>) {
        self.loaded = true;
    }

    fn unload_in_world(&mut self, _ctx: &mut ProcessorContext<'_>) {
        self.unloaded = true;
    }
}
