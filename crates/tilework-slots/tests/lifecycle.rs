//! Integration test: instance lifecycle through the slot table.
//!
//! Uses the sample processors to check spawn hook ordering, observer
//! ordering on kill, multi-tile geometry, and clone round trips.

use std::sync::{Arc, Mutex};

use tilework_core::{Authority, PacketReader, SlotId, TickId, TilePos};
use tilework_processor::{GlobalHook, GlobalHooks, ProcessorState, WorldEnv};
use tilework_slots::{Placement, SlotConfig, SlotTable};
use tilework_test_utils::fixtures::{Beacon, Furnace};
use tilework_test_utils::{init_logging, sample_registry, MockTiles, BEACON_TILE};

// ── Observers ────────────────────────────────────────────────────────

struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl GlobalHook for Recorder {
    fn on_spawn(&mut self, state: &ProcessorState) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{} spawn {}", self.name, state.slot));
    }

    fn on_kill(&mut self, state: &ProcessorState) {
        // Still indexed and carrying its position when observers run.
        assert!(state.active);
        self.log
            .lock()
            .unwrap()
            .push(format!("{} kill {} at {}", self.name, state.slot, state.position));
    }
}

fn hooks_with_log() -> (GlobalHooks, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = GlobalHooks::new();
    for name in ["a", "b"] {
        hooks.register(Box::new(Recorder {
            name,
            log: log.clone(),
        }));
    }
    (hooks, log)
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn spawn_hooks_run_in_order_then_observers() {
    init_logging();
    let types = sample_registry();
    let tiles = MockTiles::standard();
    let (mut hooks, log) = hooks_with_log();
    let env = WorldEnv::new(&tiles, Authority::Standalone, TickId(0));
    let mut table = SlotTable::new(SlotConfig::default());

    let slot = table
        .place(&types.registry, types.beacon, TilePos::new(0, 0), None, env, &mut hooks)
        .unwrap()
        .slot();
    let beacon = table
        .get(slot)
        .unwrap()
        .behavior
        .downcast_ref::<Beacon>()
        .unwrap();
    assert_eq!(beacon.spawn_order, vec!["set_property", "initialize"]);
    assert_eq!(*log.lock().unwrap(), vec!["a spawn 0", "b spawn 0"]);

    table.kill(slot, env, &mut hooks);
    assert_eq!(
        log.lock().unwrap()[2..],
        ["a kill 0 at (0, 0)", "b kill 0 at (0, 0)"]
    );
}

#[test]
fn two_by_one_structure_is_thirty_two_by_sixteen() {
    init_logging();
    let types = sample_registry();
    let mut tiles = MockTiles::standard();
    let origin = TilePos::new(5, 8);
    tiles.build(origin, BEACON_TILE);
    let mut hooks = GlobalHooks::new();
    let env = WorldEnv::new(&tiles, Authority::Server, TickId(0));
    let mut table = SlotTable::new(SlotConfig::default());

    let slot = table
        .place(&types.registry, types.beacon, origin, None, env, &mut hooks)
        .unwrap()
        .slot();
    let state = &table.get(slot).unwrap().state;
    assert_eq!(state.size(), (32, 16));
    assert_eq!(state.hit_box().width, 32);

    // The right-hand sub-tile.
    assert_eq!(
        table.kill_sub_tile(origin.offset(1, 0), env, &mut hooks),
        Some(slot)
    );
    let beacon = table
        .get(slot)
        .unwrap()
        .behavior
        .downcast_ref::<Beacon>()
        .unwrap();
    assert_eq!(beacon.broken_frames, vec![(1, 0)]);
    assert_eq!(table.live_count(types.beacon), 0);
    assert!(table.kill_sub_tile(origin, env, &mut hooks).is_none());
}

#[test]
fn clone_round_trip_reproduces_header_and_fields() {
    init_logging();
    let types = sample_registry();
    let tiles = MockTiles::standard();
    let mut hooks = GlobalHooks::new();
    let env = WorldEnv::new(&tiles, Authority::Server, TickId(0));
    let mut table = SlotTable::new(SlotConfig::default());

    for x in 0..3 {
        table
            .place(&types.registry, types.furnace, TilePos::new(x, 2), None, env, &mut hooks)
            .unwrap();
    }
    let source = table.get_mut(SlotId(2)).unwrap();
    let furnace = source.behavior.downcast_mut::<Furnace>().unwrap();
    furnace.fuel = 17;
    furnace.lit = true;
    let payload = table.get(SlotId(2)).unwrap().clone_payload();

    let entry = types.registry.entry(types.furnace).unwrap();
    let mut copy = entry.instantiate();
    let mut state = ProcessorState::new(types.furnace, SlotId(0));
    copy.net_clone_read(&mut state, &mut PacketReader::new(&payload))
        .unwrap();

    assert!(state.active);
    assert_eq!(state.slot, SlotId(2));
    assert_eq!(state.position, TilePos::new(2, 2));
    let copy = copy.downcast_ref::<Furnace>().unwrap();
    assert_eq!((copy.fuel, copy.lit), (17, true));
}

#[test]
fn killed_slot_is_reused_at_a_new_position() {
    init_logging();
    let types = sample_registry();
    let tiles = MockTiles::standard();
    let mut hooks = GlobalHooks::new();
    let env = WorldEnv::new(&tiles, Authority::Standalone, TickId(0));
    let mut table = SlotTable::new(SlotConfig::default());

    let a = TilePos::new(1, 1);
    let b = TilePos::new(40, -3);
    let first = table
        .place(&types.registry, types.furnace, a, None, env, &mut hooks)
        .unwrap();
    assert!(table.kill_at(a, env, &mut hooks));
    assert!(table.find(a).is_none());
    assert_eq!(table.live_count(types.furnace), 0);

    let second = table
        .place(&types.registry, types.ticker, b, None, env, &mut hooks)
        .unwrap();
    assert_eq!(second, Placement::Created(first.slot()));
    assert_eq!(table.find(b).unwrap().state.type_id, types.ticker);
}
