use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cradlequiz_core::model::{CategoryDef, Corpus, QuestionRecord};
use cradlequiz_core::sampler::{allocate, sample};
use cradlequiz_core::{filter, Difficulty, DifficultyMix, MatchMode, QuestionRepository};

fn generate_repo(n: usize) -> QuestionRepository {
    let keys = ["newborn", "sleep", "feeding", "bathing"];
    let categories = keys
        .iter()
        .map(|k| CategoryDef {
            key: k.to_string(),
            name: k.to_string(),
        })
        .collect();
    let questions = (0..n)
        .map(|i| QuestionRecord {
            id: format!("q-{i:05}"),
            text: format!("Question {i}?"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: i % 4,
            explanation: String::new(),
            difficulty: Difficulty::ALL[i % 3],
            tags: vec![keys[i % 4].to_string(), keys[(i / 4) % 4].to_string()],
        })
        .collect();
    QuestionRepository::build(Corpus {
        id: "bench".into(),
        categories,
        questions,
        ..Default::default()
    })
    .expect("bench corpus is valid")
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");

    let repo = generate_repo(5000);
    let mix = DifficultyMix::new(0.5, 0.3, 0.2).expect("valid mix");
    let none = BTreeSet::new();

    group.bench_function("uniform_20_of_5000", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| sample(&repo, repo.all_ids(), black_box(20), None, &none, &mut rng))
    });

    group.bench_function("stratified_20_of_5000", |b| {
        let mut rng = StdRng::seed_from_u64(2);
        b.iter(|| sample(&repo, repo.all_ids(), black_box(20), Some(&mix), &none, &mut rng))
    });

    group.bench_function("allocate", |b| {
        b.iter(|| allocate(black_box(50), &mix, black_box([7, 40, 100])))
    });

    group.finish();
}

fn bench_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtering");

    let repo = generate_repo(5000);
    let requested = vec!["sleep".to_string(), "feeding".to_string()];

    group.bench_function("any_two_categories", |b| {
        b.iter(|| filter::candidates(&repo, black_box(&requested), MatchMode::Any))
    });

    group.bench_function("all_two_categories", |b| {
        b.iter(|| filter::candidates(&repo, black_box(&requested), MatchMode::All))
    });

    group.finish();
}

criterion_group!(benches, bench_sampling, bench_filtering);
criterion_main!(benches);
