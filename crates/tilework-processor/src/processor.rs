//! The [`TileProcessor`] trait: the per-instance behavior contract.
//!
//! Every hook has a default, so a processor only overrides what it needs.
//! The shared fields of an instance live in [`ProcessorState`], owned by
//! the slot table and passed to each hook alongside `self`.

use std::any::Any;

use tilework_core::{
    DrawTarget, PacketReader, PacketWriter, PeerId, ProcessorError, TagStore, TileQuery,
    TileTypeId, WireError, TILE_SIZE,
};

use crate::context::{ProcessorContext, TypeContext};
use crate::state::ProcessorState;

/// Behavior attached to one placed tile.
///
/// # Hook timing
///
/// - [`load_static_property`](Self::load_static_property) runs once per
///   type, on the registry's prototype, when the registry is sealed.
/// - [`set_property`](Self::set_property) then
///   [`initialize`](Self::initialize) run once per instance at spawn, on
///   every peer.
/// - [`update`](Self::update) runs every tick for every active instance,
///   on every peer. It must not assume authority.
/// - [`single_instance_update`](Self::single_instance_update) runs once
///   per tick per type, on the type's shared instance, while at least one
///   instance of the type is active.
///
/// # Clone protocol
///
/// [`net_clone_send`](Self::net_clone_send) and
/// [`net_clone_read`](Self::net_clone_read) must be symmetric. Overrides
/// must start with the base header (`state.write_clone_header` /
/// `state.read_clone_header`) because receivers peek it to find the slot.
///
/// # Examples
///
/// ```
/// use tilework_core::{PacketReader, PacketWriter, ProcessorError, TileTypeId, WireError};
/// use tilework_processor::{ProcessorContext, ProcessorState, TileProcessor};
///
/// #[derive(Default)]
/// struct Lamp {
///     lit: bool,
/// }
///
/// impl TileProcessor for Lamp {
///     fn target_tile(&self) -> Option<TileTypeId> {
///         Some(TileTypeId(42))
///     }
///
///     fn update(&mut self, ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
///         if ctx.tick().0 % 60 == 0 {
///             self.lit = !self.lit;
///             ctx.request_sync();
///         }
///         Ok(())
///     }
///
///     fn net_clone_send(&self, state: &ProcessorState, w: &mut PacketWriter) {
///         state.write_clone_header(w);
///         w.write_bool(self.lit);
///     }
///
///     fn net_clone_read(
///         &mut self,
///         state: &mut ProcessorState,
///         r: &mut PacketReader<'_>,
///     ) -> Result<(), WireError> {
///         state.read_clone_header(r)?;
///         self.lit = r.read_bool()?;
///         Ok(())
///     }
/// }
///
/// assert_eq!(Lamp::default().target_tile(), Some(TileTypeId(42)));
/// ```
pub trait TileProcessor: Any + Send + 'static {
    /// The tile type this processor follows.
    ///
    /// `None` or [`TileTypeId::SENTINEL`] means the type is never placed.
    fn target_tile(&self) -> Option<TileTypeId> {
        None
    }

    /// Copy this instance's type-specific fields into a new instance.
    ///
    /// Default: `None`, meaning "default-construct the type".
    fn duplicate(&self) -> Option<Box<dyn TileProcessor>> {
        None
    }

    // ── Network ─────────────────────────────────────────────────

    /// Write the clone payload. Default: the 9-byte base header.
    fn net_clone_send(&self, state: &ProcessorState, w: &mut PacketWriter) {
        state.write_clone_header(w);
    }

    /// Read a clone payload. Default: the 9-byte base header.
    fn net_clone_read(
        &mut self,
        state: &mut ProcessorState,
        r: &mut PacketReader<'_>,
    ) -> Result<(), WireError> {
        state.read_clone_header(r)
    }

    /// Write a mod payload after `ctx.request_send_data()`.
    fn send_data(&self, state: &ProcessorState, w: &mut PacketWriter) {
        let _ = (state, w);
    }

    /// Read a mod payload sent by `sender`.
    fn receive_data(
        &mut self,
        state: &mut ProcessorState,
        r: &mut PacketReader<'_>,
        sender: PeerId,
    ) -> Result<(), ProcessorError> {
        let _ = (state, r, sender);
        Ok(())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Once per type on its prototype when the registry is sealed, before
    /// [`load_static_property`](Self::load_static_property). Acquire
    /// type-wide resources here.
    fn load(&mut self) {}

    /// Once per type on its prototype when the last handle to the
    /// registry is dropped. Mirrors [`load`](Self::load).
    fn unload(&mut self) {}

    /// Once per type when the registry is sealed.
    fn load_static_property(&mut self) {}

    /// Once per instance at spawn, before [`initialize`](Self::initialize).
    fn set_property(&mut self, ctx: &mut ProcessorContext<'_>) {
        let _ = ctx;
    }

    /// Once per instance after spawn, on every peer.
    fn initialize(&mut self, ctx: &mut ProcessorContext<'_>) {
        let _ = ctx;
    }

    /// The world session began and this instance was loaded with it.
    fn load_in_world(&mut self, ctx: &mut ProcessorContext<'_>) {
        let _ = ctx;
    }

    /// The world session is ending.
    fn unload_in_world(&mut self, ctx: &mut ProcessorContext<'_>) {
        let _ = ctx;
    }

    /// Re-read structure metadata for the instance's tile.
    ///
    /// Default: size the instance from the target tile's structure
    /// dimensions, falling back to one tile.
    fn refresh_tile(&mut self, state: &mut ProcessorState, tiles: &dyn TileQuery) {
        if let Some((w, h)) = self.target_tile().and_then(|t| tiles.structure_size(t)) {
            state.width = i32::from(w.max(1)) * TILE_SIZE;
            state.height = i32::from(h.max(1)) * TILE_SIZE;
        }
    }

    /// Per-tick work for one active instance.
    fn update(&mut self, ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
        let _ = ctx;
        Ok(())
    }

    /// Per-tick work shared by every instance of the type.
    fn single_instance_update(&mut self, ctx: &TypeContext<'_>) {
        let _ = ctx;
    }

    /// Whether the instance should be killed this tick.
    ///
    /// Default: [`default_is_dead`].
    fn is_dead(&self, ctx: &ProcessorContext<'_>) -> bool {
        default_is_dead(self.target_tile(), ctx)
    }

    /// Death hook, run before observers fire and indices are cleared.
    fn on_kill(&mut self, ctx: &mut ProcessorContext<'_>) {
        let _ = ctx;
    }

    /// A sub-tile of a multi-tile structure was destroyed.
    ///
    /// `frame_x`/`frame_y` are the sub-tile's offset from the structure's
    /// top-left tile, in tiles.
    fn on_kill_multi_tile(&mut self, state: &mut ProcessorState, frame_x: i16, frame_y: i16) {
        let _ = (state, frame_x, frame_y);
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Write persistent fields.
    fn save_data(&self, state: &ProcessorState, tag: &mut TagStore) {
        let _ = (state, tag);
    }

    /// Read persistent fields written by [`save_data`](Self::save_data).
    fn load_data(
        &mut self,
        state: &mut ProcessorState,
        tag: &TagStore,
    ) -> Result<(), ProcessorError> {
        let _ = (state, tag);
        Ok(())
    }

    // ── Drawing ─────────────────────────────────────────────────

    /// Paint before anything tile-related.
    fn pre_tile_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        let _ = (state, target);
    }

    /// Paint behind the host's tiles.
    fn back_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        let _ = (state, target);
    }

    /// Paint in front of the host's tiles.
    fn draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        let _ = (state, target);
    }

    /// Paint above everything.
    fn front_draw(&self, state: &ProcessorState, target: &mut dyn DrawTarget) {
        let _ = (state, target);
    }
}

impl dyn TileProcessor {
    /// Downcast to a concrete processor type.
    pub fn downcast_ref<T: TileProcessor>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete processor type.
    pub fn downcast_mut<T: TileProcessor>(&mut self) -> Option<&mut T> {
        let any: &mut dyn Any = self;
        any.downcast_mut::<T>()
    }
}

/// The stock dead-check.
///
/// A peer without authority never kills on its own; it waits for the
/// authoritative peer's replicated kill. Otherwise the instance is dead
/// when its tile is missing, empty, or no longer of the target type.
pub fn default_is_dead(target: Option<TileTypeId>, ctx: &ProcessorContext<'_>) -> bool {
    if !ctx.authority().is_authoritative() {
        return false;
    }
    let Some(target) = target else {
        return true;
    };
    match ctx.tile() {
        Some(info) => !info.is(target),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorldEnv;
    use tilework_core::{Authority, ProcessorTypeId, SlotId, TickId, TileInfo, TilePos};

    #[derive(Default)]
    struct Plain;

    impl TileProcessor for Plain {
        fn target_tile(&self) -> Option<TileTypeId> {
            Some(TileTypeId(7))
        }
    }

    struct Tiles(Option<TileInfo>);

    impl TileQuery for Tiles {
        fn tile_at(&self, _pos: TilePos) -> Option<TileInfo> {
            self.0
        }

        fn structure_size(&self, tile_type: TileTypeId) -> Option<(u8, u8)> {
            (tile_type == TileTypeId(7)).then_some((3, 2))
        }
    }

    fn dead_with(tiles: &Tiles, authority: Authority) -> bool {
        let mut state = ProcessorState::new(ProcessorTypeId(0), SlotId(0));
        let env = WorldEnv::new(tiles, authority, TickId(0));
        let ctx = ProcessorContext::new(&mut state, env);
        Plain.is_dead(&ctx)
    }

    #[test]
    fn authoritative_dead_check() {
        let ok = Tiles(Some(TileInfo::solid(TileTypeId(7))));
        let wrong = Tiles(Some(TileInfo::solid(TileTypeId(8))));
        let empty = Tiles(Some(TileInfo::empty()));
        let missing = Tiles(None);
        assert!(!dead_with(&ok, Authority::Server));
        assert!(dead_with(&wrong, Authority::Server));
        assert!(dead_with(&empty, Authority::Standalone));
        assert!(dead_with(&missing, Authority::Server));
    }

    #[test]
    fn client_never_kills_on_its_own() {
        for tiles in [Tiles(None), Tiles(Some(TileInfo::empty()))] {
            assert!(!dead_with(&tiles, Authority::Client));
        }
    }

    #[test]
    fn refresh_tile_uses_structure_size() {
        let mut state = ProcessorState::new(ProcessorTypeId(0), SlotId(0));
        Plain.refresh_tile(&mut state, &Tiles(None));
        assert_eq!(state.size(), (48, 32));
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn TileProcessor> = Box::new(Plain);
        assert!(boxed.downcast_ref::<Plain>().is_some());
    }
}
