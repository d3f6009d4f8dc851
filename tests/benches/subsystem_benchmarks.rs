//! Hot-path benchmarks: message codec, Luhn validation, and risk scoring.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ps_05_authorizer::{luhn_valid, HeuristicScorer, RiskScorer};
use ps_tests::fixtures::{financial, PAN};

fn bench_codec(c: &mut Criterion) {
    let message = financial(17);
    let encoded = ps_01_codec::encode(&message).expect("encode");

    c.bench_function("codec/encode", |b| {
        b.iter(|| ps_01_codec::encode(black_box(&message)).expect("encode"))
    });
    c.bench_function("codec/decode", |b| {
        b.iter(|| ps_01_codec::decode(black_box(&encoded)).expect("decode"))
    });
}

fn bench_luhn(c: &mut Criterion) {
    c.bench_function("authorizer/luhn", |b| {
        b.iter(|| luhn_valid(black_box(PAN)))
    });
}

fn bench_risk_scoring(c: &mut Criterion) {
    let message = financial(17);
    let scorer = HeuristicScorer::default();
    c.bench_function("authorizer/risk_score", |b| {
        b.iter(|| scorer.score(black_box(&message)))
    });
}

criterion_group!(benches, bench_codec, bench_luhn, bench_risk_scoring);
criterion_main!(benches);
