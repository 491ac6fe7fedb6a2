//! Turn Engine Benchmarks
//!
//! Measures puzzle generation and full turn validation per game.
//!
//! Run with: cargo bench --bench replay

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arena_turns::game::{self, autoplay, GameType};
use arena_turns::{GameConfig, Seed};

fn seed(n: u64) -> Seed {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&n.to_le_bytes());
    Seed(bytes)
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    for game_type in GameType::ALL {
        let config = GameConfig::for_game(game_type);
        group.bench_with_input(BenchmarkId::from_parameter(game_type), &config, |b, config| {
            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                black_box(game::generate(game_type, &seed(n), config))
            })
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    for game_type in GameType::ALL {
        let spec = game::generate(game_type, &seed(17), &GameConfig::for_game(game_type));
        let mut gaps = [480u64, 720, 610, 530, 690].into_iter().cycle();
        let events = autoplay::play(&spec, 0, || gaps.next().unwrap_or(600));

        group.bench_function(BenchmarkId::from_parameter(game_type), |b| {
            b.iter(|| black_box(game::validate(black_box(&spec), black_box(&events))))
        });
    }
    group.finish();
}

fn bench_spec_digest(c: &mut Criterion) {
    let spec = game::generate(GameType::Maze, &seed(3), &GameConfig::for_game(GameType::Maze));
    c.bench_function("spec_digest_maze", |b| b.iter(|| black_box(game::spec_digest(&spec))));
}

criterion_group!(benches, bench_generate, bench_validate, bench_spec_digest);
criterion_main!(benches);
