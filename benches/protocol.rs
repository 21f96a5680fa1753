//! Benchmarks for the hot protocol primitives: commitment hashing and
//! stake derivation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rps3::protocol::{
    calculate_stake, commit_move, generate_salt, verify_commitment, Move, Tier, Tokens,
};

fn bench_commitment(c: &mut Criterion) {
    let salt = generate_salt();

    c.bench_function("commit_move", |b| {
        b.iter(|| commit_move(black_box(Move::Rock), black_box(salt.as_bytes())))
    });

    let commit = commit_move(Move::Rock, salt.as_bytes());
    c.bench_function("verify_commitment", |b| {
        b.iter(|| {
            verify_commitment(
                black_box(&commit),
                black_box(Move::Rock),
                black_box(salt.as_bytes()),
            )
        })
    });

    c.bench_function("generate_salt", |b| b.iter(generate_salt));
}

fn bench_stakes(c: &mut Criterion) {
    c.bench_function("calculate_stake", |b| {
        b.iter(|| {
            calculate_stake(
                black_box(Tokens::whole(10)),
                black_box(Move::Rock),
                black_box(Tier::Degen),
            )
        })
    });
}

criterion_group!(benches, bench_commitment, bench_stakes);
criterion_main!(benches);
