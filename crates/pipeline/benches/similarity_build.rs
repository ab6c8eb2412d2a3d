//! Benchmarks for the offline build
//!
//! Run with: cargo bench --package pipeline
//!
//! This will benchmark feature fitting and the similarity matrix on the
//! bundled dataset.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_loader::MovieCatalog;
use pipeline::{FeatureBuilder, FeatureConfig, SimilarityMatrix};
use std::path::Path;

fn load_test_data() -> MovieCatalog {
    let path = Path::new("../../data/movies_dataset.json");
    MovieCatalog::load_from_file(path).expect("Failed to load test data")
}

fn bench_feature_fit(c: &mut Criterion) {
    let catalog = load_test_data();

    c.bench_function("feature_builder_fit", |b| {
        b.iter(|| {
            let builder =
                FeatureBuilder::fit(black_box(catalog.movies()), FeatureConfig::default()).unwrap();
            black_box(builder)
        })
    });
}

fn bench_similarity(c: &mut Criterion) {
    let catalog = load_test_data();
    let builder = FeatureBuilder::fit(catalog.movies(), FeatureConfig::default())
        .expect("Failed to fit features");
    let features = builder.build_matrix(catalog.movies());

    c.bench_function("similarity_compute", |b| {
        b.iter(|| {
            let sim = SimilarityMatrix::compute(black_box(&features));
            black_box(sim)
        })
    });
}

criterion_group!(benches, bench_feature_fit, bench_similarity);
criterion_main!(benches);
