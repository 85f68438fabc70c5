// Performance benchmarks for encoding and local aggregation
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchmate_core::{Profile, UserRecord};
use matchmate_schema::FeatureEncoder;
use matchmate_similarity::CandidateAggregator;
use rand::prelude::*;

const PERSONALITIES: &[&str] = &["introvert", "extrovert", "ambivert"];
const SLEEP: &[&str] = &["early-bird", "night-owl", "flexible"];
const CLEANLINESS: &[&str] = &["very-clean", "clean", "average", "messy"];
const HOBBIES: &[&str] = &["reading", "sports", "travelling", "music", "movies", "gaming", "cooking", "art"];

fn pick(rng: &mut ThreadRng, values: &[&str]) -> Option<String> {
    values.choose(rng).map(|v| v.to_string())
}

fn generate_random_profile(rng: &mut ThreadRng) -> Profile {
    let hobby_count = rng.random_range(0..4);
    Profile {
        age: Some(rng.random_range(18.0..60.0f64).round()),
        personality_type: pick(rng, PERSONALITIES),
        sleep_pattern: pick(rng, SLEEP),
        cleanliness_level: pick(rng, CLEANLINESS),
        commute_tolerance_minutes: Some(rng.random_range(0.0..120.0)),
        hobbies: HOBBIES
            .choose_multiple(rng, hobby_count)
            .map(|h| h.to_string())
            .collect(),
        has_pets: Some(if rng.random_bool(0.3) { "true" } else { "false" }.to_string()),
        form_completed: true,
        ..Default::default()
    }
}

fn generate_pool(size: usize) -> Vec<UserRecord> {
    let mut rng = rand::rng();
    (0..size)
        .map(|i| UserRecord::new(format!("{}", i), format!("User {}", i)).with_profile(generate_random_profile(&mut rng)))
        .collect()
}

fn benchmark_encode(c: &mut Criterion) {
    let mut rng = rand::rng();
    let profile = generate_random_profile(&mut rng);

    for (name, encoder) in [("standard", FeatureEncoder::standard()), ("extended", FeatureEncoder::extended())] {
        c.bench_function(&format!("encode_{}", name), |b| {
            b.iter(|| encoder.encode(black_box(&profile)));
        });
    }
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("recommend");
    let aggregator = CandidateAggregator::default();

    for size in [100, 1000, 10000].iter() {
        let pool = generate_pool(*size);
        let requester = pool[0].clone();
        group.bench_with_input(BenchmarkId::new("local", size), size, |b, _| {
            b.iter(|| aggregator.recommend(black_box(&requester), black_box(&pool), 5));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_recommend);
criterion_main!(benches);
