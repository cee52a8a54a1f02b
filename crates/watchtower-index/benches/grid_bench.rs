use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::time::Duration;
use watchtower_index::{
    AoiManager, BruteForceAoi, Entity, EntityId, GridConfig, Position, TowerGrid, VisibleSet,
};

const WORLD: f32 = 2_000.0;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn populate<M: AoiManager<u32, VisibleSet>>(
    manager: &mut M,
    rng: &mut SmallRng,
    count: u32,
) -> Vec<(EntityId, Position)> {
    (0..count)
        .map(|tag| {
            let at = Position::new(rng.random_range(0.0..WORLD), rng.random_range(0.0..WORLD));
            let radius = rng.random_range(20.0..80.0);
            let id = manager
                .enter(Entity::new(radius, tag, VisibleSet::new()), at)
                .expect("enter");
            (id, at)
        })
        .collect()
}

fn wander<M: AoiManager<u32, VisibleSet>>(
    manager: &mut M,
    rng: &mut SmallRng,
    agents: &mut [(EntityId, Position)],
    steps: usize,
) {
    for _ in 0..steps {
        for (id, at) in agents.iter_mut() {
            at.x = (at.x + rng.random_range(-4.0..4.0)).clamp(0.0, WORLD);
            at.y = (at.y + rng.random_range(-4.0..4.0)).clamp(0.0, WORLD);
            manager.moved(*id, *at).expect("move");
        }
    }
}

fn bench_moves(c: &mut Criterion) {
    let mut group = c.benchmark_group("aoi_moves");
    group.sample_size(env_or("WT_BENCH_SAMPLES", 20_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("WT_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("WT_BENCH_MEASURE_SECS", 8)));
    let steps = env_or("WT_BENCH_STEPS", 16_usize).max(1);
    let populations: Vec<u32> = std::env::var("WT_BENCH_AGENTS")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter_map(|token| token.trim().parse().ok())
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| vec![500, 2_000]);
    let config = GridConfig::new(0.0, WORLD, 0.0, WORLD, 50.0);

    for &agents in &populations {
        group.bench_function(format!("tower_agents{agents}_steps{steps}"), |b| {
            b.iter_batched(
                || {
                    let mut rng = SmallRng::seed_from_u64(0x70EE);
                    let mut grid: TowerGrid<u32, VisibleSet> =
                        TowerGrid::new(config).expect("grid");
                    let placed = populate(&mut grid, &mut rng, agents);
                    (grid, rng, placed)
                },
                |(mut grid, mut rng, mut placed)| wander(&mut grid, &mut rng, &mut placed, steps),
                BatchSize::LargeInput,
            );
        });
        group.bench_function(format!("brute_agents{agents}_steps{steps}"), |b| {
            b.iter_batched(
                || {
                    let mut rng = SmallRng::seed_from_u64(0x70EE);
                    let mut oracle: BruteForceAoi<u32, VisibleSet> =
                        BruteForceAoi::new(config).expect("oracle");
                    let placed = populate(&mut oracle, &mut rng, agents);
                    (oracle, rng, placed)
                },
                |(mut oracle, mut rng, mut placed)| {
                    wander(&mut oracle, &mut rng, &mut placed, steps)
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_moves);
criterion_main!(benches);
