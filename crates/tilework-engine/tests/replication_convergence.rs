//! Integration test: a client replaying a server's outbox converges.
//!
//! Random placements, kills, mined tiles, and ticks run on a server
//! session. After every operation the server's clone-syncs are queued on
//! a client session sharing the same world, and the client ticks. The
//! client must end with exactly the server's live instances: same slots,
//! positions, and types.

use proptest::prelude::*;
use tilework_core::{Authority, ProcessorTypeId, SlotId, TilePos, TileTypeId};
use tilework_engine::{Session, SessionConfig, StructuralChange, SyncEvent};
use tilework_test_utils::{
    init_logging, sample_registry, MockTiles, SampleTypes, BEACON_TILE, FURNACE_TILE, TICKER_TILE,
};

// ── Operations ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Op {
    Place { kind: u8, x: i16, y: i16 },
    KillAt { x: i16, y: i16 },
    Mine { x: i16, y: i16 },
    Step,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3, 0i16..6, 0i16..4).prop_map(|(kind, x, y)| Op::Place { kind, x, y }),
        (0i16..6, 0i16..4).prop_map(|(x, y)| Op::KillAt { x, y }),
        (0i16..6, 0i16..4).prop_map(|(x, y)| Op::Mine { x, y }),
        Just(Op::Step),
    ]
}

fn kind(types: &SampleTypes, k: u8) -> (ProcessorTypeId, TileTypeId) {
    match k {
        0 => (types.furnace, FURNACE_TILE),
        1 => (types.ticker, TICKER_TILE),
        _ => (types.beacon, BEACON_TILE),
    }
}

fn live(session: &Session) -> Vec<(SlotId, TilePos, ProcessorTypeId)> {
    session
        .table()
        .iter_active()
        .map(|s| (s.state.slot, s.state.position, s.state.type_id))
        .collect()
}

fn relay(server: &mut Session, client: &mut Session, tiles: &MockTiles) {
    for event in server.drain_outbox() {
        if let SyncEvent::CloneSync { type_id, payload } = event {
            client
                .enqueue(StructuralChange::ApplyClone { type_id, payload })
                .unwrap();
        }
    }
    client.step(tiles);
}

// ── Property ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn client_mirrors_server(ops in proptest::collection::vec(op(), 1..60)) {
        init_logging();
        let types = sample_registry();
        let mut server = Session::new(types.registry.clone(), SessionConfig::new(Authority::Server)).unwrap();
        let mut client = Session::new(types.registry.clone(), SessionConfig::new(Authority::Client)).unwrap();
        let mut tiles = MockTiles::standard();

        for op in ops {
            match op {
                Op::Place { kind: k, x, y } => {
                    let (type_id, tile) = kind(&types, k);
                    let pos = TilePos::new(x, y);
                    tiles.build(pos, tile);
                    let _ = server.place(&tiles, type_id, pos, None);
                }
                Op::KillAt { x, y } => {
                    server.kill_at(&tiles, TilePos::new(x, y));
                }
                Op::Mine { x, y } => tiles.clear(TilePos::new(x, y)),
                Op::Step => {
                    server.step(&tiles);
                }
            }
            relay(&mut server, &mut client, &tiles);
        }
        // Let the server's dead-check settle any mined tiles.
        server.step(&tiles);
        relay(&mut server, &mut client, &tiles);

        prop_assert_eq!(live(&client), live(&server));
        for (_, _, type_id) in live(&server) {
            prop_assert_eq!(client.live_count(type_id), server.live_count(type_id));
        }
    }
}
