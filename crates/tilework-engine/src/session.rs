//! The tick driver.
//!
//! A [`Session`] owns one peer's slot table and drives it: it drains the
//! pending structural-change queue, runs the dead-check and `update` for
//! every active instance, then the once-per-type shared update. State
//! changes that peers must see are recorded as [`SyncEvent`]s in an
//! outbox for the network layer to flush.
//!
//! # Tick order
//!
//! 1. Drain pending changes (placements, kills, replicas, payloads).
//! 2. For each active slot in slot order: kill it if dead, else update it
//!    unless it is faulted or idle (see [`Session::set_focus`]).
//! 3. `single_instance_update` for each type with at least one live instance.
//!
//! Every hook call is guarded: a panic faults the instance like an `Err`.
//! 4. Turn hook requests into outbox events.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tilework_core::{
    Authority, PacketReader, PeerId, PixelPos, PlaceError, ProcessorTypeId, SlotId, SourceItem,
    TickId, TilePos, TileQuery,
};
use tilework_processor::{
    guard_hook, GlobalHook, GlobalHooks, ProcessorContext, TileProcessor, TypeContext,
    TypeRegistry, WorldEnv,
};
use tilework_slots::{Placement, ReplicaOutcome, Slot, SlotTable};

use crate::config::{ConfigError, SessionConfig};
use crate::metrics::TickMetrics;
use crate::pending::{PendingError, PendingQueue, StructuralChange};

/// A state change peers must be told about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    /// Replicate an instance's clone payload.
    CloneSync {
        /// The instance's type.
        type_id: ProcessorTypeId,
        /// Output of `net_clone_send`.
        payload: Vec<u8>,
    },
    /// Deliver a mod payload to the same slot on other peers.
    ModData {
        /// The instance's type.
        type_id: ProcessorTypeId,
        /// The sender's slot for the instance.
        slot: SlotId,
        /// Output of `send_data`.
        data: Vec<u8>,
    },
}

/// One peer's processor world.
pub struct Session {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) config: SessionConfig,
    pub(crate) table: SlotTable,
    shared: Vec<Box<dyn TileProcessor>>,
    shared_faulted: Vec<bool>,
    pub(crate) hooks: GlobalHooks,
    focus: Option<PixelPos>,
    pending: PendingQueue,
    outbox: Vec<SyncEvent>,
    tick: TickId,
    last_metrics: TickMetrics,
}

fn world_env(tiles: &dyn TileQuery, authority: Authority, tick: TickId) -> WorldEnv<'_> {
    WorldEnv::new(tiles, authority, tick)
}

impl Session {
    /// Create a session over a sealed registry.
    pub fn new(registry: Arc<TypeRegistry>, config: SessionConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            warn!("rejected session config: {e}");
            return Err(e);
        }
        if registry.is_empty() {
            warn!("rejected session config: {}", ConfigError::NoProcessorTypes);
            return Err(ConfigError::NoProcessorTypes);
        }
        let shared: Vec<Box<dyn TileProcessor>> =
            registry.iter().map(|e| e.instantiate()).collect();
        info!(
            "session created as {:?}: {} processor types, {} slots",
            config.authority,
            registry.len(),
            config.max_slots
        );
        Ok(Self {
            table: SlotTable::new(config.slot_config()),
            pending: PendingQueue::new(config.max_pending),
            registry,
            config,
            shared_faulted: vec![false; shared.len()],
            shared,
            hooks: GlobalHooks::new(),
            focus: None,
            outbox: Vec::new(),
            tick: TickId(0),
            last_metrics: TickMetrics::default(),
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    /// The type registry.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// This peer's role.
    pub fn authority(&self) -> Authority {
        self.config.authority
    }

    /// The slot table, read-only.
    pub fn table(&self) -> &SlotTable {
        &self.table
    }

    /// The last completed tick.
    pub fn current_tick(&self) -> TickId {
        self.tick
    }

    /// Counters from the most recent [`step`](Self::step).
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    /// The active instance whose origin is `position`.
    pub fn find(&self, position: TilePos) -> Option<&Slot> {
        self.table.find(position)
    }

    /// Active instances of `type_id`.
    pub fn live_count(&self, type_id: ProcessorTypeId) -> u32 {
        self.table.live_count(type_id)
    }

    /// The shared instance that receives `single_instance_update`.
    pub fn shared_instance(&self, type_id: ProcessorTypeId) -> Option<&dyn TileProcessor> {
        self.shared.get(type_id.0 as usize).map(|b| b.as_ref())
    }

    /// The point idle distances are measured from, if any.
    pub fn focus(&self) -> Option<PixelPos> {
        self.focus
    }

    /// Set the point, usually the local player's center, that
    /// [`ProcessorState::idle_distance`](tilework_processor::ProcessorState::idle_distance)
    /// is measured from. With no focus nothing idles.
    pub fn set_focus(&mut self, focus: Option<PixelPos>) {
        self.focus = focus;
    }

    /// Number of queued structural changes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append a global observer; it fires after those already registered.
    pub fn register_hook(&mut self, hook: Box<dyn GlobalHook>) {
        self.hooks.register(hook);
    }

    // ── Immediate mutation ──────────────────────────────────────

    /// Spawn an instance now, outside the tick loop.
    ///
    /// A replicating peer records a clone-sync for a new instance. A
    /// non-authoritative peer refuses with [`PlaceError::NotAuthoritative`].
    pub fn place(
        &mut self,
        tiles: &dyn TileQuery,
        type_id: ProcessorTypeId,
        position: TilePos,
        source_item: Option<SourceItem>,
    ) -> Result<Placement, PlaceError> {
        let env = world_env(tiles, self.config.authority, self.tick);
        let result = self.place_in(env, type_id, position, source_item);
        self.process_requests();
        result
    }

    /// Spawn an instance of Rust type `P` now.
    pub fn place_as<P: TileProcessor>(
        &mut self,
        tiles: &dyn TileQuery,
        position: TilePos,
        source_item: Option<SourceItem>,
    ) -> Result<Placement, PlaceError> {
        let type_id = self.registry.resolve::<P>()?.id();
        self.place(tiles, type_id, position, source_item)
    }

    /// Kill the instance whose origin is `position`, now.
    ///
    /// Like every `kill*` method, this does nothing on a non-authoritative
    /// peer.
    pub fn kill_at(&mut self, tiles: &dyn TileQuery, position: TilePos) -> bool {
        let env = world_env(tiles, self.config.authority, self.tick);
        let killed = match self.table.find_slot(position) {
            Some(slot) => self.kill_slot(slot, env),
            None => false,
        };
        self.process_requests();
        killed
    }

    /// Kill the instance in `slot`, now.
    pub fn kill(&mut self, tiles: &dyn TileQuery, slot: SlotId) -> bool {
        let env = world_env(tiles, self.config.authority, self.tick);
        let killed = self.kill_slot(slot, env);
        self.process_requests();
        killed
    }

    /// Kill the multi-tile instance covering `position`, now.
    pub fn kill_sub_tile(&mut self, tiles: &dyn TileQuery, position: TilePos) -> Option<SlotId> {
        let env = world_env(tiles, self.config.authority, self.tick);
        let slot = self.kill_sub_tile_in(position, env);
        self.process_requests();
        slot
    }

    /// Queue a change for the start of the next tick.
    pub fn enqueue(&mut self, change: StructuralChange) -> Result<(), PendingError> {
        self.pending.push(change).inspect_err(|e| {
            warn!("dropped structural change: {e}");
        })
    }

    fn place_in(
        &mut self,
        env: WorldEnv<'_>,
        type_id: ProcessorTypeId,
        position: TilePos,
        source_item: Option<SourceItem>,
    ) -> Result<Placement, PlaceError> {
        if !self.owns_membership("placement") {
            return Err(PlaceError::NotAuthoritative);
        }
        let result = self.table.place(
            &self.registry,
            type_id,
            position,
            source_item,
            env,
            &mut self.hooks,
        );
        match &result {
            Ok(Placement::Created(slot)) if self.config.authority.replicates() => {
                self.emit_clone(*slot);
            }
            Ok(_) => {}
            Err(e) => warn!("placement of type {type_id} at {position} rejected: {e}"),
        }
        result
    }

    fn kill_slot(&mut self, slot: SlotId, env: WorldEnv<'_>) -> bool {
        if !self.owns_membership("kill") {
            return false;
        }
        let killed = self.table.kill(slot, env, &mut self.hooks);
        if killed {
            self.after_kill(slot);
        }
        killed
    }

    fn kill_sub_tile_in(&mut self, position: TilePos, env: WorldEnv<'_>) -> Option<SlotId> {
        if !self.owns_membership("sub-tile kill") {
            return None;
        }
        let slot = self.table.kill_sub_tile(position, env, &mut self.hooks)?;
        self.after_kill(slot);
        Some(slot)
    }

    /// Slot membership on a non-authoritative peer follows the
    /// authoritative peer's clone-syncs only. A local instance would take
    /// a slot the authority may later fill with a different one.
    pub(crate) fn owns_membership(&self, op: &str) -> bool {
        let owns = self.config.authority.is_authoritative();
        if !owns {
            warn!("{op} ignored on a non-authoritative peer");
        }
        owns
    }

    /// Replicate a death from the authoritative peer.
    fn after_kill(&mut self, slot: SlotId) {
        if self.config.authority.replicates() {
            self.emit_clone(slot);
        }
    }

    // ── Tick ────────────────────────────────────────────────────

    /// Advance one tick.
    ///
    /// No instance failure escapes this call: failing hooks are logged,
    /// the instance is marked faulted, and the tick continues.
    pub fn step(&mut self, tiles: &dyn TileQuery) -> TickMetrics {
        let start = Instant::now();
        self.tick = TickId(self.tick.0 + 1);
        let env = world_env(tiles, self.config.authority, self.tick);
        let outbox_before = self.outbox.len();
        let mut m = TickMetrics {
            tick: self.tick,
            ..TickMetrics::default()
        };

        // 1. Pending structural changes.
        for change in self.pending.drain() {
            m.pending_applied += 1;
            self.apply_change(change, env, &mut m);
        }

        // 2. Dead-check, then update.
        for slot in self.table.active_slots() {
            if self.table.is_dead(slot, env) {
                if self.kill_slot(slot, env) {
                    m.killed += 1;
                }
                continue;
            }
            if self.table.get(slot).is_some_and(|s| s.state.faulted) {
                m.suspended += 1;
                continue;
            }
            let idle = self.focus.is_some_and(|focus| {
                self.table
                    .get(slot)
                    .is_some_and(|s| s.state.is_idle(focus))
            });
            if idle {
                m.idle += 1;
                continue;
            }
            match self.table.update(slot, env) {
                Ok(()) => m.updated += 1,
                Err(e) => {
                    m.faulted += 1;
                    if let Some(s) = self.table.get(slot) {
                        warn!("{} update failed: {e}", self.registry.describe(&s.state));
                    }
                }
            }
        }

        // 3. Once per type.
        for (idx, shared) in self.shared.iter_mut().enumerate() {
            let type_id = ProcessorTypeId(idx as u32);
            let live_count = self.table.live_count(type_id);
            if live_count == 0 || self.shared_faulted[idx] {
                continue;
            }
            let ctx = TypeContext {
                type_id,
                live_count,
                env,
            };
            match guard_hook(|| shared.single_instance_update(&ctx)) {
                Ok(()) => m.single_updates += 1,
                Err(e) => {
                    m.faulted += 1;
                    self.shared_faulted[idx] = true;
                    warn!("shared update of type {type_id} disabled: {e}");
                }
            }
        }

        // 4. Hook requests.
        self.process_requests();

        m.events_emitted = (self.outbox.len() - outbox_before) as u32;
        m.total_us = start.elapsed().as_micros() as u64;
        if m.killed > 0 || m.desyncs > 0 {
            debug!(
                "tick {}: {} killed, {} desyncs, {} active",
                m.tick,
                m.killed,
                m.desyncs,
                self.table.active_len()
            );
        }
        self.last_metrics = m.clone();
        m
    }

    fn apply_change(&mut self, change: StructuralChange, env: WorldEnv<'_>, m: &mut TickMetrics) {
        match change {
            StructuralChange::Place {
                type_id,
                position,
                source_item,
            } => {
                let _ = self.place_in(env, type_id, position, source_item);
            }
            StructuralChange::KillAt { position } => {
                if let Some(slot) = self.table.find_slot(position) {
                    self.kill_slot(slot, env);
                }
            }
            StructuralChange::KillSubTile { position } => {
                self.kill_sub_tile_in(position, env);
            }
            StructuralChange::ApplyClone { type_id, payload } => {
                if self.config.authority.is_authoritative() {
                    warn!("desync: clone-sync for type {type_id} sent to an authoritative peer");
                    m.desyncs += 1;
                    return;
                }
                match self.table.apply_replica(
                    &self.registry,
                    type_id,
                    &payload,
                    env,
                    &mut self.hooks,
                ) {
                    Ok(outcome) => {
                        m.replicas_applied += 1;
                        if let ReplicaOutcome::Killed(slot) = outcome {
                            debug!("replicated kill of slot {slot}");
                        }
                    }
                    Err(e) => {
                        warn!("desync: clone-sync for type {type_id} skipped: {e}");
                        m.desyncs += 1;
                    }
                }
            }
            StructuralChange::ModPayload {
                type_id,
                slot,
                sender,
                data,
            } => {
                if !self.deliver_payload(type_id, slot, sender, &data) {
                    m.desyncs += 1;
                }
            }
        }
    }

    fn deliver_payload(
        &mut self,
        type_id: ProcessorTypeId,
        slot: SlotId,
        sender: PeerId,
        data: &[u8],
    ) -> bool {
        let Some(target) = self.table.get_mut(slot) else {
            warn!("desync: payload from peer {sender} for unknown slot {slot}");
            return false;
        };
        if !target.state.active || target.state.type_id != type_id {
            warn!(
                "desync: payload from peer {sender} for slot {slot} expected type {type_id}, found {}",
                if target.state.active {
                    target.state.type_id.to_string()
                } else {
                    "inactive".to_string()
                }
            );
            return false;
        }
        let mut reader = PacketReader::new(data);
        match target
            .behavior
            .receive_data(&mut target.state, &mut reader, sender)
        {
            Ok(()) => true,
            Err(e) => {
                warn!("payload from peer {sender} for slot {slot} rejected: {e}");
                false
            }
        }
    }

    // ── Outbox ──────────────────────────────────────────────────

    pub(crate) fn emit_clone(&mut self, slot: SlotId) {
        if let Some(s) = self.table.get(slot) {
            self.outbox.push(SyncEvent::CloneSync {
                type_id: s.state.type_id,
                payload: s.clone_payload(),
            });
        }
    }

    fn process_requests(&mut self) {
        for (slot, requests) in self.table.take_requests() {
            if requests.sync && self.config.authority.replicates() {
                self.emit_clone(slot);
            }
            if requests.send_data {
                if let Some(s) = self.table.get(slot) {
                    self.outbox.push(SyncEvent::ModData {
                        type_id: s.state.type_id,
                        slot,
                        data: s.data_payload(),
                    });
                }
            }
        }
    }

    /// Take every recorded sync event, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// One clone-sync per active instance that opted into join data, in
    /// slot order.
    pub fn join_snapshot(&self) -> Vec<SyncEvent> {
        self.table
            .iter_active()
            .filter(|s| s.state.send_join_data)
            .map(|s| SyncEvent::CloneSync {
                type_id: s.state.type_id,
                payload: s.clone_payload(),
            })
            .collect()
    }

    // ── World load / unload ─────────────────────────────────────

    /// Scan `positions` for qualifying tiles, place their processors, then
    /// run `load_in_world` on every active instance.
    ///
    /// Positions are visited top-left first so a multi-tile structure is
    /// placed once, at its origin. Returns the number of instances the
    /// scan created. A non-authoritative peer skips the scan; its
    /// instances arrive by replication.
    pub fn load_world(
        &mut self,
        tiles: &dyn TileQuery,
        positions: impl IntoIterator<Item = TilePos>,
    ) -> usize {
        let env = world_env(tiles, self.config.authority, self.tick);
        let mut positions: Vec<TilePos> = positions.into_iter().collect();
        positions.sort_unstable();

        if !self.config.authority.is_authoritative() {
            debug!("world scan skipped on a non-authoritative peer");
            positions.clear();
        }

        let mut created = 0;
        for pos in positions {
            let Some(info) = tiles.tile_at(pos) else {
                continue;
            };
            if !info.has_tile || self.table.covering(pos).is_some() {
                continue;
            }
            let Some(type_id) = self.registry.for_tile(info.tile_type).map(|e| e.id()) else {
                continue;
            };
            match self
                .table
                .place(&self.registry, type_id, pos, None, env, &mut self.hooks)
            {
                Ok(Placement::Created(_)) => created += 1,
                Ok(Placement::Existing(_)) => {}
                Err(e) => warn!("world scan could not place type {type_id} at {pos}: {e}"),
            }
        }

        for slot in self.table.active_slots() {
            self.world_hook(slot, env, "load", |p, ctx| p.load_in_world(ctx));
        }
        self.process_requests();
        info!(
            "world loaded: {created} placed by scan, {} active",
            self.table.active_len()
        );
        created
    }

    /// Run `unload_in_world` on every active instance, then drop them all.
    pub fn unload_world(&mut self, tiles: &dyn TileQuery) {
        let env = world_env(tiles, self.config.authority, self.tick);
        for slot in self.table.active_slots() {
            self.world_hook(slot, env, "unload", |p, ctx| p.unload_in_world(ctx));
        }
        info!("world unloaded: {} instances dropped", self.table.active_len());
        self.table.clear();
        self.pending.clear();
        self.outbox.clear();
        self.shared_faulted.fill(false);
    }

    /// Run a world lifecycle hook on `slot`; a panic faults the instance.
    fn world_hook(
        &mut self,
        slot: SlotId,
        env: WorldEnv<'_>,
        phase: &str,
        hook: fn(&mut dyn TileProcessor, &mut ProcessorContext<'_>),
    ) {
        let outcome = self
            .table
            .with_context(slot, env, |p, ctx| guard_hook(|| hook(p, ctx)));
        if let Some(Err(e)) = outcome {
            if let Some(s) = self.table.get_mut(slot) {
                s.state.faulted = true;
                warn!("{phase} of {} failed: {e}", self.registry.describe(&s.state));
            }
        }
    }

    pub(crate) fn env<'t>(&self, tiles: &'t dyn TileQuery) -> WorldEnv<'t> {
        world_env(tiles, self.config.authority, self.tick)
    }
}
