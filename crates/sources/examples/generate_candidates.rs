//! Example: Generate candidates from every source
//!
//! Run with: cargo run --package sources --example generate_candidates
//!
//! This example shows how to:
//! 1. Build the artifact set in memory from the bundled dataset
//! 2. Find content neighbors of a movie
//! 3. Browse by genre and at random
//! 4. Train a small factorization model and blend it into hybrid scores

use data_loader::{MovieCatalog, RatingStore};
use pipeline::{ArtifactSet, FeatureConfig};
use sources::{
    user_context::build_user_context, CandidateSource, ContentSource, DiscoverySource,
    FactorizationConfig, HybridSource, HybridWeights, MatrixFactorization,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Cinematch Candidate Generation Example ===\n");

    let start = Instant::now();
    let catalog = MovieCatalog::load_from_file(Path::new("data/movies_dataset.json"))?;
    let artifacts = Arc::new(ArtifactSet::build(catalog, FeatureConfig::default())?);
    println!("Built artifacts in {:?}\n", start.elapsed());

    let title_of = |id| {
        artifacts
            .catalog
            .get_movie(id)
            .map(|m| m.title.as_str())
            .unwrap_or("?")
    };

    // Content neighbors of Interstellar
    let content = ContentSource::new(artifacts.clone());
    println!("Movies like Interstellar:");
    for (i, c) in content.similar_to(157336, 5)?.iter().enumerate() {
        println!("  {}. {} (similarity {:.3})", i + 1, title_of(c.movie_id), c.score);
    }

    // Discovery
    let discovery = DiscoverySource::new(artifacts.catalog.clone());
    println!("\nTop crime movies:");
    for c in discovery.by_genre("crime", 3)? {
        println!("  - {} ({:.1})", title_of(c.movie_id), c.score);
    }
    println!("\nRandom picks:");
    for c in discovery.random(3) {
        assert_eq!(c.source, CandidateSource::Random);
        println!("  - {}", title_of(c.movie_id));
    }

    // Hybrid with a throwaway rating store
    let mut store = RatingStore::new("ratings.json");
    store.upsert("demo", 157336, 9.5)?;
    store.upsert("demo", 27205, 9.0)?;
    store.upsert("demo", 238, 4.0)?;
    store.upsert("other", 157336, 9.0)?;
    store.upsert("other", 286217, 8.5)?;
    store.upsert("other", 603, 8.0)?;

    let model = MatrixFactorization::fit(&store, &FactorizationConfig::default())?;
    let hybrid = HybridSource::new(artifacts.clone(), Some(Arc::new(model)), HybridWeights::default())?;
    let context = build_user_context(&store, &artifacts.catalog, "demo");

    println!("\nHybrid picks for 'demo':");
    for c in hybrid.get_candidates(&context, None, 5)? {
        let predicted = c
            .metadata
            .predicted_score
            .map(|p| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  - {} (score {:.2}, content {:.2}, predicted {})",
            title_of(c.movie_id),
            c.score,
            c.metadata.content_score.unwrap_or(0.0),
            predicted
        );
    }

    Ok(())
}
