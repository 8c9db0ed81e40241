//! Benchmark for snapshot encoding and decoding.
//!
//! A host with a busy level: every player slot filled plus a few hundred
//! enemies, coins and projectiles. Measures one broadcast encode into the
//! tick arena and one full decode of the result.
//!
//! Run with: cargo bench --package tether_networking --bench snapshot_benchmark

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tether_core::Arena;
use tether_networking::snapshot::{self, SnapshotScope};
use tether_networking::{MockSimulation, NetworkConfig, Session};
use tether_shared::{EntityType, PeerId, Vec3};

const ENEMIES: usize = 200;
const COINS: usize = 100;
const PROJECTILES: usize = 100;

fn busy_host() -> (Session, MockSimulation) {
    let mut sim = MockSimulation::new();
    let mut session = Session::host(PeerId(1), NetworkConfig::default());
    let kinds = [
        (EntityType::Husk, ENEMIES),
        (EntityType::Coin, COINS),
        (EntityType::Rocket, PROJECTILES),
    ];
    for (ty, count) in kinds {
        for i in 0..count {
            let x = i as f32;
            session.spawn(ty, Vec3::new(x, 0.0, -x), &mut sim);
        }
    }
    (session, sim)
}

fn bench_encode(c: &mut Criterion) {
    let (session, mut sim) = busy_host();
    let mut arena = Arena::new(1 << 20);

    c.bench_function("snapshot_encode_400", |b| {
        b.iter(|| {
            arena.reset();
            let ctx = session.context(&mut sim);
            let bytes = snapshot::encode(session.registry(), SnapshotScope::All, &ctx, &mut arena)
                .unwrap_or_default();
            black_box(bytes.len())
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let (session, mut sim) = busy_host();
    let mut arena = Arena::new(1 << 20);
    let bytes = {
        let ctx = session.context(&mut sim);
        snapshot::encode(session.registry(), SnapshotScope::All, &ctx, &mut arena)
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    };
    let mut triples = Vec::with_capacity(ENEMIES + COINS + PROJECTILES + 1);

    c.bench_function("snapshot_decode_400", |b| {
        b.iter(|| {
            let ok = snapshot::decode_into(black_box(&bytes), &mut triples).is_ok();
            black_box((ok, triples.len()))
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
