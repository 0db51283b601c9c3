//! Criterion micro-benchmarks for slot placement, lookup, and replica apply.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tilework_bench::{bench_registry, populated_session, GridTiles};
use tilework_core::{Authority, TickId, TilePos};
use tilework_processor::{GlobalHooks, WorldEnv};
use tilework_slots::{SlotConfig, SlotTable};

/// Place then kill one instance per tile of a 32x32 grid.
fn bench_place_kill_1k(c: &mut Criterion) {
    let (registry, pulse) = bench_registry();
    let tiles = GridTiles::new(32, 32);
    let positions: Vec<TilePos> = tiles.positions().collect();
    let env = WorldEnv::new(&tiles, Authority::Standalone, TickId(0));
    let mut hooks = GlobalHooks::new();
    let mut table = SlotTable::new(SlotConfig::new(1024));

    c.bench_function("slot_place_kill_1k", |b| {
        b.iter(|| {
            for &pos in &positions {
                table
                    .place(&registry, pulse, pos, None, env, &mut hooks)
                    .unwrap();
            }
            for &pos in &positions {
                table.kill_at(pos, env, &mut hooks);
            }
            black_box(table.active_len());
        });
    });
}

/// Position lookups against a full 64x64 session.
fn bench_find_4k(c: &mut Criterion) {
    let (session, tiles) = populated_session(64, 64, Authority::Standalone);
    let positions: Vec<TilePos> = tiles.positions().collect();

    c.bench_function("slot_find_4k", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            for &pos in &positions {
                if session.find(black_box(pos)).is_some() {
                    hits += 1;
                }
            }
            black_box(hits);
        });
    });
}

/// Apply every server clone payload to a client table.
fn bench_apply_replica_1k(c: &mut Criterion) {
    let (server, tiles) = populated_session(32, 32, Authority::Server);
    let payloads: Vec<Vec<u8>> = server
        .table()
        .iter_active()
        .map(|s| s.clone_payload())
        .collect();
    let (registry, pulse) = bench_registry();
    let env = WorldEnv::new(&tiles, Authority::Client, TickId(0));
    let mut hooks = GlobalHooks::new();
    let mut table = SlotTable::new(SlotConfig::new(1024));

    c.bench_function("slot_apply_replica_1k", |b| {
        b.iter(|| {
            for payload in &payloads {
                table
                    .apply_replica(&registry, pulse, payload, env, &mut hooks)
                    .unwrap();
            }
            black_box(table.active_len());
        });
    });
}

criterion_group!(
    benches,
    bench_place_kill_1k,
    bench_find_4k,
    bench_apply_replica_1k
);
criterion_main!(benches);
