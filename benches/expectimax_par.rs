use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use emm_2048::engine::{Board, Move};
use emm_2048::expectimax::{Expectimax, ExpectimaxConfig, ExpectimaxParallel, ParThresholds};
use rand::{rngs::StdRng, SeedableRng};
use rayon::ThreadPoolBuilder;
use std::hint::black_box;

/// Midgame boards reached by a fixed rotation of moves.
fn midgame(n: usize) -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(2025);
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    let mut out = Vec::with_capacity(n);
    let mut step = 0usize;
    while out.len() < n && !b.is_game_over() {
        let nb = b.shift(Move::ALL[step % 4]);
        if nb != b {
            b = nb.with_random_tile(&mut rng);
            if step % 3 == 0 { out.push(b); }
        }
        step += 1;
    }
    out
}

fn bench_sampling(c: &mut Criterion) {
    let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let boards = midgame(16);
    let mut group = c.benchmark_group("expectimax_par/sampling");
    group.sample_size(20);
    for (label, cap) in [("cap_7", Some(7)), ("full", None)] {
        let cfg = ExpectimaxConfig { depth: 3, sample_cap: cap, seed: Some(1), ..Default::default() };
        let mut par = ExpectimaxParallel::with_config(cfg.clone());
        group.bench_function(BenchmarkId::new("parallel", label), |bch| {
            bch.iter(|| pool.install(|| boards.iter().map(|&bd| par.state_value(bd)).sum::<f64>()))
        });
        let mut seq = Expectimax::with_config(cfg);
        group.bench_function(BenchmarkId::new("sequential", label), |bch| {
            bch.iter(|| boards.iter().map(|&bd| seq.state_value(bd)).sum::<f64>())
        });
    }
    group.finish();
}

fn bench_thresholds(c: &mut Criterion) {
    let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let boards = midgame(16);
    let mut group = c.benchmark_group("expectimax_par/thresholds");
    group.sample_size(20);
    // par_depth above the search depth keeps chance plies sequential.
    for (par_depth, par_slots) in [(2, 4), (3, 2), (6, 4)] {
        let cfg = ExpectimaxConfig {
            depth: 5,
            seed: Some(1),
            cache_enabled: true,
            par_thresholds: ParThresholds { par_depth, par_slots },
            ..Default::default()
        };
        let mut par = ExpectimaxParallel::with_config(cfg);
        let id = BenchmarkId::new("best_move", format!("d{par_depth}_s{par_slots}"));
        group.bench_function(id, |bch| {
            bch.iter(|| pool.install(|| {
                let mut acc = 0u64;
                for &bd in &boards {
                    acc ^= par.best_move(bd).map(|mv| mv as u64).unwrap_or(0);
                }
                black_box(acc)
            }))
        });
    }
    group.finish();
}

criterion_group!(expectimax_par, bench_sampling, bench_thresholds);
criterion_main!(expectimax_par);
