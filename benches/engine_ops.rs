use criterion::{criterion_group, criterion_main, Criterion};
use emm_2048::engine::{merge_line, Board, Move};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Up, Move::Right, Move::Down];
    for i in 0..128 {
        let nb = b.shift(seq[i % seq.len()]);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_merge_line(c: &mut Criterion) {
    let lines = [[2, 2, 4, 4], [0, 2, 0, 2], [4, 4, 4, 4], [2, 4, 8, 16], [0, 0, 0, 2]];
    c.bench_function("engine/merge_line", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for &l in &lines { acc ^= merge_line(black_box(l))[0]; }
            black_box(acc)
        })
    });
}

fn bench_shift(c: &mut Criterion) {
    let boards = corpus();
    c.bench_function("engine/shift_all_dirs", |bch| {
        bch.iter(|| {
            let mut acc = 0u64;
            for &bd in &boards {
                for dir in Move::ALL { acc = acc.wrapping_add(bd.shift(dir).score()); }
            }
            black_box(acc)
        })
    });
    c.bench_function("engine/has_moves_available", |bch| {
        bch.iter(|| black_box(boards.iter().filter(|b| b.has_moves_available()).count()))
    });
}

fn bench_random_game(c: &mut Criterion) {
    c.bench_function("engine/random_game", |bch| {
        bch.iter(|| {
            let mut rng = StdRng::seed_from_u64(9);
            let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
            let mut steps = 0u32;
            while !b.is_game_over() {
                b = b.make_move(Move::ALL[(steps % 4) as usize], &mut rng);
                steps += 1;
            }
            black_box((b, steps))
        })
    });
}

criterion_group!(engine_ops, bench_merge_line, bench_shift, bench_random_game);
criterion_main!(engine_ops);
