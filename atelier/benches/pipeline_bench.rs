//! Benchmarks for classification, backoff lookup and request composition.

use atelier::compose::{BriefComposer, PromptComposer, StageInputs};
use atelier::config::RetryConfig;
use atelier::core::{DesignBrief, Stage};
use atelier::jobs::{PhraseClassifier, TransientClassifier};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn classifier_benchmark(c: &mut Criterion) {
    let classifier = PhraseClassifier::default();
    let messages = [
        "Prediction interrupted; please retry (code: E003)",
        "Service is currently unavailable due to high demand",
        "NSFW content detected",
        "API Error: 422 - invalid image_input",
    ];

    c.bench_function("classify_messages", |b| {
        b.iter(|| {
            messages
                .iter()
                .filter(|m| classifier.is_transient(black_box(m)))
                .count()
        });
    });
}

fn backoff_benchmark(c: &mut Criterion) {
    let retry = RetryConfig::default();

    c.bench_function("delay_for_attempt", |b| {
        b.iter(|| (0..8).map(|n| retry.delay_for_attempt(black_box(n))).sum::<std::time::Duration>());
    });
}

fn compose_benchmark(c: &mut Criterion) {
    let brief = DesignBrief::new("oversized wool overcoat")
        .with_garment_type("coat")
        .with_colors(["camel", "black"])
        .with_attribute("fabric", "wool");
    let inputs = StageInputs::new()
        .with_source("https://cdn.example/model.jpg")
        .with_logo_reference("https://cdn.example/colored.jpg");

    c.bench_function("compose_angles", |b| {
        b.iter(|| BriefComposer.compose(Stage::Angles, black_box(&brief), black_box(&inputs)));
    });
}

criterion_group!(benches, classifier_benchmark, backoff_benchmark, compose_benchmark);
criterion_main!(benches);
