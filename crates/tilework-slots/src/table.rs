//! The slot table: live-instance arena, free set, and position index.
//!
//! [`SlotTable`] owns every processor instance on one peer. Slots are
//! reused lowest-first once their occupant dies, so a slot id
//! is stable only for the lifetime of one instance. Three indices are
//! kept consistent on every mutation:
//!
//! - `free`: inactive slot ids, eligible for reuse.
//! - `positions`: tile position → slot of the active instance there.
//! - `live`: active instance count per type id.
//!
//! Hooks run with a [`ProcessorContext`]; any sync or payload requests
//! they make are buffered until the owner calls
//! [`SlotTable::take_requests`].

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::{debug, warn};
use smallvec::SmallVec;
use tilework_core::{
    PacketReader, PlaceError, ProcessorError, ProcessorTypeId, SlotId, SourceItem, TilePos,
};
use tilework_processor::{
    guard_hook, CloneHeader, GlobalHooks, ProcessorContext, ProcessorState, Requests,
    TileProcessor, TypeEntry, TypeRegistry, WorldEnv,
};

use crate::config::SlotConfig;
use crate::error::ApplyError;
use crate::slot::{Placement, ReplicaOutcome, Slot};

/// Buffered hook requests, in the order they were made.
pub type RequestBuffer = SmallVec<[(SlotId, Requests); 8]>;

/// Arena of processor instances with a position index.
///
/// # Examples
///
/// ```
/// use tilework_core::{Authority, TickId, TileInfo, TilePos, TileQuery, TileTypeId};
/// use tilework_processor::{GlobalHooks, RegistryBuilder, TileProcessor, WorldEnv};
/// use tilework_slots::{SlotConfig, SlotTable};
///
/// #[derive(Default)]
/// struct Sign;
/// impl TileProcessor for Sign {
///     fn target_tile(&self) -> Option<TileTypeId> { Some(TileTypeId(55)) }
/// }
///
/// struct Flat;
/// impl TileQuery for Flat {
///     fn tile_at(&self, _: TilePos) -> Option<TileInfo> {
///         Some(TileInfo::solid(TileTypeId(55)))
///     }
/// }
///
/// let mut builder = RegistryBuilder::new();
/// let sign = builder.register::<Sign>("deco").unwrap();
/// let registry = builder.build();
///
/// let mut table = SlotTable::new(SlotConfig::default());
/// let mut hooks = GlobalHooks::new();
/// let env = WorldEnv::new(&Flat, Authority::Standalone, TickId(0));
///
/// let placed = table
///     .place(&registry, sign, TilePos::new(4, 9), None, env, &mut hooks)
///     .unwrap();
/// assert!(placed.is_created());
/// assert_eq!(table.live_count(sign), 1);
/// assert!(table.kill_at(TilePos::new(4, 9), env, &mut hooks));
/// assert_eq!(table.live_count(sign), 0);
/// ```
pub struct SlotTable {
    config: SlotConfig,
    slots: Vec<Slot>,
    free: BTreeSet<u32>,
    positions: IndexMap<TilePos, SlotId>,
    live: Vec<u32>,
    active: usize,
    requests: RequestBuffer,
}

impl SlotTable {
    /// An empty table.
    pub fn new(config: SlotConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            free: BTreeSet::new(),
            positions: IndexMap::new(),
            live: Vec::new(),
            active: 0,
            requests: SmallVec::new(),
        }
    }

    /// The table's configuration.
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    // ── Placement ───────────────────────────────────────────────

    /// Spawn an instance of `type_id` at `position`.
    ///
    /// Placing the same type twice at one position returns the existing
    /// slot without spawning. Errors leave the table untouched.
    pub fn place(
        &mut self,
        registry: &TypeRegistry,
        type_id: ProcessorTypeId,
        position: TilePos,
        source_item: Option<SourceItem>,
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) -> Result<Placement, PlaceError> {
        let entry = registry.entry(type_id)?;
        if !entry.is_placeable() {
            return Err(PlaceError::TargetTileUnset { type_id });
        }
        if let Some(&occupant) = self.positions.get(&position) {
            let occupant_type = self.slots[occupant.index()].state.type_id;
            if occupant_type == type_id {
                return Ok(Placement::Existing(occupant));
            }
            return Err(PlaceError::PositionOccupied {
                position,
                occupant,
                occupant_type,
            });
        }
        let slot = self.next_free().ok_or(PlaceError::CapacityExceeded {
            capacity: self.config.max_slots,
        })?;

        let mut behavior = entry.instantiate();
        let mut state = ProcessorState::new(type_id, slot);
        state.position = position;
        state.source_item = source_item;
        behavior.refresh_tile(&mut state, env.tiles);
        state.active = true;

        self.install(Slot::new(state, behavior));
        self.index_active(slot, type_id, position);
        self.spawn(slot, env, hooks);
        debug!("placed {} at {position} in slot {slot}", entry.full_name());
        Ok(Placement::Created(slot))
    }

    /// Lowest reusable slot, or the next fresh one while under capacity.
    fn next_free(&self) -> Option<SlotId> {
        if let Some(&idx) = self.free.first() {
            return Some(SlotId(idx));
        }
        let next = u32::try_from(self.slots.len()).ok()?;
        (next < self.config.max_slots).then_some(SlotId(next))
    }

    /// Store `slot` at its index, appending if it is the next fresh slot.
    fn install(&mut self, slot: Slot) {
        let idx = slot.state.slot.index();
        self.free.remove(&slot.state.slot.0);
        if idx == self.slots.len() {
            self.slots.push(slot);
        } else {
            self.slots[idx] = slot;
        }
    }

    fn index_active(&mut self, slot: SlotId, type_id: ProcessorTypeId, position: TilePos) {
        let t = type_id.0 as usize;
        if self.live.len() <= t {
            self.live.resize(t + 1, 0);
        }
        self.live[t] += 1;
        self.positions.insert(position, slot);
        self.active += 1;
    }

    fn unindex(&mut self, slot: SlotId, type_id: ProcessorTypeId, position: TilePos) {
        if self.positions.get(&position) == Some(&slot) {
            self.positions.swap_remove(&position);
        }
        if let Some(count) = self.live.get_mut(type_id.0 as usize) {
            *count = count.saturating_sub(1);
        }
        self.free.insert(slot.0);
        self.active = self.active.saturating_sub(1);
    }

    /// Run `set_property`, `initialize`, then the spawn observers.
    fn spawn(&mut self, slot: SlotId, env: WorldEnv<'_>, hooks: &mut GlobalHooks) {
        let s = &mut self.slots[slot.index()];
        let mut ctx = ProcessorContext::new(&mut s.state, env);
        s.behavior.set_property(&mut ctx);
        s.behavior.initialize(&mut ctx);
        let requests = ctx.requests();
        s.state.spawned = true;
        hooks.fire_spawn(&s.state);
        self.record(slot, requests);
    }

    // ── Removal ─────────────────────────────────────────────────

    /// Kill the instance in `slot`.
    ///
    /// Runs `on_kill`, then the kill observers, then clears the source
    /// item and removes the instance from every index. Returns `false`
    /// if the slot was not active.
    pub fn kill(&mut self, slot: SlotId, env: WorldEnv<'_>, hooks: &mut GlobalHooks) -> bool {
        let Some(s) = self.slots.get_mut(slot.index()) else {
            return false;
        };
        if !s.state.active {
            return false;
        }
        let mut ctx = ProcessorContext::new(&mut s.state, env);
        s.behavior.on_kill(&mut ctx);
        let requests = ctx.requests();
        hooks.fire_kill(&s.state);

        s.state.source_item = None;
        s.state.active = false;
        s.state.hovered = false;
        s.state.on_screen = false;
        let (type_id, position) = (s.state.type_id, s.state.position);
        self.unindex(slot, type_id, position);
        self.record(slot, requests);
        true
    }

    /// Kill the instance whose origin is `position`, if any.
    pub fn kill_at(
        &mut self,
        position: TilePos,
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) -> bool {
        match self.positions.get(&position).copied() {
            Some(slot) => self.kill(slot, env, hooks),
            None => false,
        }
    }

    /// Kill the multi-tile instance covering `position`.
    ///
    /// Runs `on_kill_multi_tile` with the sub-tile's offset from the
    /// structure origin, in tiles, then kills the instance.
    pub fn kill_sub_tile(
        &mut self,
        position: TilePos,
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) -> Option<SlotId> {
        let slot = self.covering(position)?;
        let s = &mut self.slots[slot.index()];
        let frame_x = position.x.saturating_sub(s.state.position.x);
        let frame_y = position.y.saturating_sub(s.state.position.y);
        s.behavior
            .on_kill_multi_tile(&mut s.state, frame_x, frame_y);
        self.kill(slot, env, hooks);
        Some(slot)
    }

    /// The active instance whose footprint includes `position`.
    pub fn covering(&self, position: TilePos) -> Option<SlotId> {
        if let Some(&slot) = self.positions.get(&position) {
            return Some(slot);
        }
        self.positions
            .values()
            .copied()
            .find(|slot| self.slots[slot.index()].state.covers(position))
    }

    /// Drop every instance without running hooks.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.positions.clear();
        self.live.clear();
        self.active = 0;
        self.requests.clear();
    }

    // ── Hooks ───────────────────────────────────────────────────

    /// Run `f` against an active instance with a fresh context.
    ///
    /// Returns `None` if the slot is not active. Requests made through
    /// the context are buffered.
    pub fn with_context<R>(
        &mut self,
        slot: SlotId,
        env: WorldEnv<'_>,
        f: impl FnOnce(&mut dyn TileProcessor, &mut ProcessorContext<'_>) -> R,
    ) -> Option<R> {
        let s = self.slots.get_mut(slot.index())?;
        if !s.state.active {
            return None;
        }
        let mut ctx = ProcessorContext::new(&mut s.state, env);
        let out = f(s.behavior.as_mut(), &mut ctx);
        let requests = ctx.requests();
        self.record(slot, requests);
        Some(out)
    }

    /// Run one instance's `update`.
    ///
    /// Inactive and faulted instances are skipped. A failing or panicking
    /// update marks the instance faulted.
    pub fn update(&mut self, slot: SlotId, env: WorldEnv<'_>) -> Result<(), ProcessorError> {
        let faulted = self
            .slots
            .get(slot.index())
            .is_some_and(|s| s.state.faulted);
        if faulted {
            return Ok(());
        }
        let result = self
            .with_context(slot, env, |p, ctx| guard_hook(|| p.update(ctx)).and_then(|r| r))
            .unwrap_or(Ok(()));
        if result.is_err() {
            self.slots[slot.index()].state.faulted = true;
        }
        result
    }

    /// Whether the instance should be killed this tick.
    ///
    /// A faulted instance counts as dead on an authoritative peer. A
    /// panicking dead-check faults the instance.
    pub fn is_dead(&mut self, slot: SlotId, env: WorldEnv<'_>) -> bool {
        let Some(s) = self.slots.get_mut(slot.index()) else {
            return false;
        };
        if !s.state.active {
            return false;
        }
        if s.state.faulted {
            return env.authority.is_authoritative();
        }
        let verdict = {
            let ctx = ProcessorContext::new(&mut s.state, env);
            let behavior = &s.behavior;
            guard_hook(|| behavior.is_dead(&ctx))
        };
        match verdict {
            Ok(dead) => dead,
            Err(e) => {
                warn!("dead-check of slot {slot} failed: {e}");
                s.state.faulted = true;
                env.authority.is_authoritative()
            }
        }
    }

    fn record(&mut self, slot: SlotId, requests: Requests) {
        if !requests.is_empty() {
            self.requests.push((slot, requests));
        }
    }

    /// Drain buffered hook requests.
    pub fn take_requests(&mut self) -> RequestBuffer {
        std::mem::take(&mut self.requests)
    }

    // ── Replication ─────────────────────────────────────────────

    /// Apply a clone payload received from the authoritative peer.
    ///
    /// The slot comes from the payload's header. Missing slots are
    /// synthesized as inactive placeholders of `type_id`; a live local
    /// instance of another type in that slot is killed first. Activation
    /// evicts any other local instance at the replica's position.
    pub fn apply_replica(
        &mut self,
        registry: &TypeRegistry,
        type_id: ProcessorTypeId,
        payload: &[u8],
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) -> Result<ReplicaOutcome, ApplyError> {
        let entry = registry.entry(type_id)?;
        let header = CloneHeader::peek(payload)?;
        let slot = header.slot;
        if slot.0 >= self.config.max_slots {
            return Err(ApplyError::SlotOutOfRange {
                slot,
                capacity: self.config.max_slots,
            });
        }
        self.grow_to(slot, entry);

        let existing = &self.slots[slot.index()].state;
        let tracked = existing.active && existing.type_id == type_id;
        if existing.active && !tracked {
            warn!(
                "replica of {} replaces local {} in slot {slot}",
                entry.full_name(),
                registry.describe(existing)
            );
            self.kill(slot, env, hooks);
        }

        let mut reader = PacketReader::new(payload);
        if tracked {
            let s = &mut self.slots[slot.index()];
            let mut state = s.state.clone();
            s.behavior.net_clone_read(&mut state, &mut reader)?;
            warn_trailing(entry, &reader);
            state.type_id = type_id;
            state.slot = slot;
            self.apply_tracked(slot, state, env, hooks)
        } else {
            let mut behavior = entry.instantiate();
            let mut state = ProcessorState::new(type_id, slot);
            behavior.net_clone_read(&mut state, &mut reader)?;
            warn_trailing(entry, &reader);
            state.type_id = type_id;
            state.slot = slot;
            if !state.active {
                return Ok(ReplicaOutcome::Stale(slot));
            }
            let position = state.position;
            self.evict(position, slot, env, hooks);
            behavior.refresh_tile(&mut state, env.tiles);
            self.install(Slot::new(state, behavior));
            self.index_active(slot, type_id, position);
            self.spawn(slot, env, hooks);
            Ok(ReplicaOutcome::Spawned(slot))
        }
    }

    fn apply_tracked(
        &mut self,
        slot: SlotId,
        mut state: ProcessorState,
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) -> Result<ReplicaOutcome, ApplyError> {
        let old_position = self.slots[slot.index()].state.position;
        if !state.active {
            // Kill from the indexed placement so the position entry clears.
            state.active = true;
            state.position = old_position;
            self.slots[slot.index()].state = state;
            self.kill(slot, env, hooks);
            return Ok(ReplicaOutcome::Killed(slot));
        }
        if state.position != old_position {
            self.evict(state.position, slot, env, hooks);
            if self.positions.get(&old_position) == Some(&slot) {
                self.positions.swap_remove(&old_position);
            }
            self.positions.insert(state.position, slot);
        }
        self.slots[slot.index()].state = state;
        Ok(ReplicaOutcome::Updated(slot))
    }

    /// Append inactive placeholders until `slot` exists.
    fn grow_to(&mut self, slot: SlotId, entry: &TypeEntry) {
        while self.slots.len() <= slot.index() {
            let idx = self.slots.len() as u32;
            let state = ProcessorState::new(entry.id(), SlotId(idx));
            self.slots.push(Slot::new(state, entry.instantiate()));
            self.free.insert(idx);
        }
    }

    /// Kill a local instance at `position` other than `keep`.
    fn evict(
        &mut self,
        position: TilePos,
        keep: SlotId,
        env: WorldEnv<'_>,
        hooks: &mut GlobalHooks,
    ) {
        if let Some(&other) = self.positions.get(&position) {
            if other != keep {
                warn!("replica in slot {keep} displaces local slot {other} at {position}");
                self.kill(other, env, hooks);
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// The active instance whose origin is `position`.
    pub fn find(&self, position: TilePos) -> Option<&Slot> {
        self.positions
            .get(&position)
            .map(|slot| &self.slots[slot.index()])
    }

    /// Slot of the active instance whose origin is `position`.
    pub fn find_slot(&self, position: TilePos) -> Option<SlotId> {
        self.positions.get(&position).copied()
    }

    /// The slot's occupant, live or stale.
    pub fn get(&self, slot: SlotId) -> Option<&Slot> {
        self.slots.get(slot.index())
    }

    /// Mutable access to the slot's occupant, live or stale.
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Slot> {
        self.slots.get_mut(slot.index())
    }

    /// Active instances of `type_id`. O(1).
    pub fn live_count(&self, type_id: ProcessorTypeId) -> u32 {
        self.live.get(type_id.0 as usize).copied().unwrap_or(0)
    }

    /// Number of active instances.
    pub fn active_len(&self) -> usize {
        self.active
    }

    /// Number of slots, live or stale.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Active instances in slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.state.active)
    }

    /// Mutable active instances in slot order.
    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots.iter_mut().filter(|s| s.state.active)
    }

    /// Snapshot of the active slot ids, in slot order.
    pub fn active_slots(&self) -> Vec<SlotId> {
        self.iter_active().map(|s| s.state.slot).collect()
    }
}

fn warn_trailing(entry: &TypeEntry, reader: &PacketReader<'_>) {
    if reader.remaining() > 0 {
        warn!(
            "clone payload for {} left {} unread bytes; send/read are asymmetric",
            entry.full_name(),
            reader.remaining()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tilework_core::{
        Authority, PacketWriter, RegistryError, TickId, TileInfo, TileQuery, TileTypeId,
        WireError,
    };
    use tilework_processor::{default_is_dead, RegistryBuilder};

    const BARREL_TILE: TileTypeId = TileTypeId(30);
    const ALTAR_TILE: TileTypeId = TileTypeId(31);

    #[derive(Default)]
    struct Barrel;
    impl TileProcessor for Barrel {
        fn target_tile(&self) -> Option<TileTypeId> {
            Some(BARREL_TILE)
        }
    }

    #[derive(Default)]
    struct Altar {
        frames: Vec<(i16, i16)>,
    }
    impl TileProcessor for Altar {
        fn target_tile(&self) -> Option<TileTypeId> {
            Some(ALTAR_TILE)
        }
        fn on_kill_multi_tile(&mut self, _s: &mut ProcessorState, fx: i16, fy: i16) {
            self.frames.push((fx, fy));
        }
    }

    #[derive(Default)]
    struct Unplaced;
    impl TileProcessor for Unplaced {
        fn target_tile(&self) -> Option<TileTypeId> {
            Some(TileTypeId::SENTINEL)
        }
    }

    #[derive(Default)]
    struct World(HashMap<TilePos, TileTypeId>);
    impl TileQuery for World {
        fn tile_at(&self, pos: TilePos) -> Option<TileInfo> {
            Some(
                self.0
                    .get(&pos)
                    .map_or(TileInfo::empty(), |&t| TileInfo::solid(t)),
            )
        }
        fn structure_size(&self, tile: TileTypeId) -> Option<(u8, u8)> {
            (tile == ALTAR_TILE).then_some((3, 2))
        }
    }

    fn registry() -> (TypeRegistry, ProcessorTypeId, ProcessorTypeId, ProcessorTypeId) {
        let mut b = RegistryBuilder::new();
        let barrel = b.register::<Barrel>("test").unwrap();
        let altar = b.register::<Altar>("test").unwrap();
        let unplaced = b.register::<Unplaced>("test").unwrap();
        (b.build(), barrel, altar, unplaced)
    }

    fn env(world: &World, authority: Authority) -> WorldEnv<'_> {
        WorldEnv::new(world, authority, TickId(0))
    }

    #[test]
    fn place_is_idempotent_for_same_type() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        let p = TilePos::new(1, 1);
        let first = t.place(&reg, barrel, p, None, e, &mut hooks).unwrap();
        let second = t.place(&reg, barrel, p, None, e, &mut hooks).unwrap();
        assert_eq!(first, Placement::Created(SlotId(0)));
        assert_eq!(second, Placement::Existing(SlotId(0)));
        assert_eq!(t.live_count(barrel), 1);
        assert!(t.get(SlotId(0)).unwrap().state.spawned);
    }

    #[test]
    fn different_type_occupant_rejected_without_mutation() {
        let (reg, barrel, altar, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        let p = TilePos::new(0, 0);
        t.place(&reg, barrel, p, None, e, &mut hooks).unwrap();
        let err = t.place(&reg, altar, p, None, e, &mut hooks).unwrap_err();
        assert_eq!(
            err,
            PlaceError::PositionOccupied {
                position: p,
                occupant: SlotId(0),
                occupant_type: barrel
            }
        );
        assert_eq!(t.live_count(altar), 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn sentinel_and_unknown_types_rejected() {
        let (reg, _, _, unplaced) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        assert_eq!(
            t.place(&reg, unplaced, TilePos::new(0, 0), None, e, &mut hooks),
            Err(PlaceError::TargetTileUnset { type_id: unplaced })
        );
        assert_eq!(
            t.place(&reg, ProcessorTypeId(99), TilePos::new(0, 0), None, e, &mut hooks),
            Err(PlaceError::Registry(RegistryError::UnknownTypeId {
                id: ProcessorTypeId(99)
            }))
        );
        assert!(t.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::new(2));
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        t.place(&reg, barrel, TilePos::new(0, 0), None, e, &mut hooks).unwrap();
        t.place(&reg, barrel, TilePos::new(1, 0), None, e, &mut hooks).unwrap();
        assert_eq!(
            t.place(&reg, barrel, TilePos::new(2, 0), None, e, &mut hooks),
            Err(PlaceError::CapacityExceeded { capacity: 2 })
        );
        t.kill_at(TilePos::new(0, 0), e, &mut hooks);
        let again = t.place(&reg, barrel, TilePos::new(2, 0), None, e, &mut hooks);
        assert_eq!(again, Ok(Placement::Created(SlotId(0))));
    }

    #[test]
    fn kill_excludes_and_frees_lowest_slot() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        let item = SourceItem {
            item_type: 4,
            stack: 1,
        };
        for x in 0..3 {
            t.place(&reg, barrel, TilePos::new(x, 0), Some(item), e, &mut hooks)
                .unwrap();
        }
        assert!(t.kill(SlotId(1), e, &mut hooks));
        assert!(!t.kill(SlotId(1), e, &mut hooks));
        assert!(t.find(TilePos::new(1, 0)).is_none());
        assert_eq!(t.live_count(barrel), 2);
        assert_eq!(t.get(SlotId(1)).unwrap().state.source_item, None);

        let reused = t
            .place(&reg, barrel, TilePos::new(9, 9), None, e, &mut hooks)
            .unwrap();
        assert_eq!(reused, Placement::Created(SlotId(1)));
        assert_eq!(t.active_slots(), vec![SlotId(0), SlotId(1), SlotId(2)]);
    }

    #[test]
    fn multi_tile_size_and_sub_tile_kill() {
        let (reg, _, altar, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Standalone);
        let origin = TilePos::new(10, 5);
        let slot = t
            .place(&reg, altar, origin, None, e, &mut hooks)
            .unwrap()
            .slot();
        assert_eq!(t.get(slot).unwrap().state.size(), (48, 32));
        assert_eq!(t.covering(TilePos::new(12, 6)), Some(slot));
        assert_eq!(t.covering(TilePos::new(13, 6)), None);

        assert_eq!(t.kill_sub_tile(TilePos::new(12, 6), e, &mut hooks), Some(slot));
        let s = t.get(slot).unwrap();
        assert!(!s.is_active());
        let altar_state = s.behavior.downcast_ref::<Altar>().unwrap();
        assert_eq!(altar_state.frames, vec![(2, 1)]);
    }

    #[test]
    fn replica_synthesizes_missing_slot() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Client);

        let mut remote = ProcessorState::new(barrel, SlotId(4));
        remote.active = true;
        remote.position = TilePos::new(7, 7);
        let mut w = PacketWriter::new();
        remote.write_clone_header(&mut w);
        let payload = w.into_bytes();

        let out = t.apply_replica(&reg, barrel, &payload, e, &mut hooks).unwrap();
        assert_eq!(out, ReplicaOutcome::Spawned(SlotId(4)));
        assert_eq!(t.len(), 5);
        assert_eq!(t.active_len(), 1);
        assert_eq!(t.find_slot(TilePos::new(7, 7)), Some(SlotId(4)));

        // Local placement reuses the placeholders below the replica.
        let local = t
            .place(&reg, barrel, TilePos::new(0, 0), None, e, &mut hooks)
            .unwrap();
        assert_eq!(local, Placement::Created(SlotId(0)));
    }

    #[test]
    fn replica_kill_and_move() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Client);
        let mut remote = ProcessorState::new(barrel, SlotId(0));
        remote.active = true;
        remote.position = TilePos::new(1, 1);
        let send = |s: &ProcessorState| {
            let mut w = PacketWriter::new();
            s.write_clone_header(&mut w);
            w.into_bytes()
        };
        t.apply_replica(&reg, barrel, &send(&remote), e, &mut hooks).unwrap();

        remote.position = TilePos::new(2, 2);
        let out = t.apply_replica(&reg, barrel, &send(&remote), e, &mut hooks).unwrap();
        assert_eq!(out, ReplicaOutcome::Updated(SlotId(0)));
        assert!(t.find(TilePos::new(1, 1)).is_none());
        assert_eq!(t.find_slot(TilePos::new(2, 2)), Some(SlotId(0)));

        remote.active = false;
        let out = t.apply_replica(&reg, barrel, &send(&remote), e, &mut hooks).unwrap();
        assert_eq!(out, ReplicaOutcome::Killed(SlotId(0)));
        assert_eq!(t.live_count(barrel), 0);
        assert!(t.find(TilePos::new(2, 2)).is_none());

        let out = t.apply_replica(&reg, barrel, &send(&remote), e, &mut hooks).unwrap();
        assert_eq!(out, ReplicaOutcome::Stale(SlotId(0)));
    }

    #[test]
    fn replica_evicts_conflicting_local_instance() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Client);
        t.place(&reg, barrel, TilePos::new(3, 3), None, e, &mut hooks).unwrap();

        let mut remote = ProcessorState::new(barrel, SlotId(2));
        remote.active = true;
        remote.position = TilePos::new(3, 3);
        let mut w = PacketWriter::new();
        remote.write_clone_header(&mut w);
        t.apply_replica(&reg, barrel, w.as_bytes(), e, &mut hooks).unwrap();

        assert_eq!(t.find_slot(TilePos::new(3, 3)), Some(SlotId(2)));
        assert_eq!(t.live_count(barrel), 1);
        assert!(!t.get(SlotId(0)).unwrap().is_active());
    }

    #[test]
    fn replica_errors_leave_table_untouched() {
        let (reg, barrel, _, _) = registry();
        let world = World::default();
        let mut t = SlotTable::new(SlotConfig::new(8));
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Client);

        assert!(matches!(
            t.apply_replica(&reg, barrel, &[1, 0], e, &mut hooks),
            Err(ApplyError::Wire(WireError::Truncated { .. }))
        ));
        assert!(matches!(
            t.apply_replica(&reg, ProcessorTypeId(40), &[0; 9], e, &mut hooks),
            Err(ApplyError::Registry(_))
        ));
        let mut far = ProcessorState::new(barrel, SlotId(8));
        far.active = true;
        let mut w = PacketWriter::new();
        far.write_clone_header(&mut w);
        assert_eq!(
            t.apply_replica(&reg, barrel, w.as_bytes(), e, &mut hooks),
            Err(ApplyError::SlotOutOfRange {
                slot: SlotId(8),
                capacity: 8
            })
        );
        assert!(t.is_empty());
    }

    const BRITTLE_TILE: TileTypeId = TileTypeId(32);

    /// Panics in `update` by indexing past the end of `cells`, and in
    /// `is_dead` once `shaky` is set.
    #[derive(Default)]
    struct Brittle {
        cells: Vec<u8>,
        shaky: bool,
    }
    impl TileProcessor for Brittle {
        fn target_tile(&self) -> Option<TileTypeId> {
            Some(BRITTLE_TILE)
        }
        fn update(&mut self, _ctx: &mut ProcessorContext<'_>) -> Result<(), ProcessorError> {
            self.cells[0] += 1;
            Ok(())
        }
        fn is_dead(&self, ctx: &ProcessorContext<'_>) -> bool {
            assert!(!self.shaky, "dead-check lost its footing");
            default_is_dead(self.target_tile(), ctx)
        }
    }

    #[test]
    fn panicking_update_faults_instead_of_unwinding() {
        let mut b = RegistryBuilder::new();
        let brittle = b.register::<Brittle>("test").unwrap();
        let reg = b.build();
        let mut world = World::default();
        let p = TilePos::new(5, 5);
        world.0.insert(p, BRITTLE_TILE);
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let e = env(&world, Authority::Server);
        let slot = t.place(&reg, brittle, p, None, e, &mut hooks).unwrap().slot();

        let err = t.update(slot, e).unwrap_err();
        assert!(matches!(err, ProcessorError::Panicked { .. }), "{err:?}");
        assert!(t.get(slot).unwrap().state.faulted);
        // Faulted instances are not called again.
        assert_eq!(t.update(slot, e), Ok(()));
        assert!(t.is_dead(slot, e));
    }

    #[test]
    fn panicking_dead_check_faults_the_instance() {
        let mut b = RegistryBuilder::new();
        let brittle = b.register::<Brittle>("test").unwrap();
        let reg = b.build();
        let mut world = World::default();
        let p = TilePos::new(0, 3);
        world.0.insert(p, BRITTLE_TILE);
        let mut t = SlotTable::new(SlotConfig::default());
        let mut hooks = GlobalHooks::new();
        let slot = t
            .place(&reg, brittle, p, None, env(&world, Authority::Client), &mut hooks)
            .unwrap()
            .slot();
        t.get_mut(slot)
            .unwrap()
            .behavior
            .downcast_mut::<Brittle>()
            .unwrap()
            .shaky = true;

        // A client never kills on its own, even after a fault.
        assert!(!t.is_dead(slot, env(&world, Authority::Client)));
        assert!(t.get(slot).unwrap().state.faulted);
        assert!(t.is_dead(slot, env(&world, Authority::Server)));
    }
}
