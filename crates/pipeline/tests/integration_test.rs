//! Integration tests for the build pipeline.
//!
//! These run the full build over the bundled dataset and check the
//! properties the recommender relies on.

use data_loader::MovieCatalog;
use pipeline::artifacts::{FEATURES_FILE, REQUIRED_FILES, SIMILARITY_FILE};
use pipeline::{ArtifactSet, FeatureConfig};
use std::path::PathBuf;

fn dataset_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/movies_dataset.json")
}

fn build() -> ArtifactSet {
    let catalog = MovieCatalog::load_from_file(&dataset_path()).unwrap();
    ArtifactSet::build(catalog, FeatureConfig::default()).unwrap()
}

#[test]
fn test_similarity_is_symmetric() {
    let artifacts = build();
    let sim = &artifacts.similarity;

    for i in 0..sim.len() {
        for j in 0..sim.len() {
            assert_eq!(sim.get(i, j), sim.get(j, i), "asymmetric at ({i}, {j})");
        }
    }
}

#[test]
fn test_self_similarity_is_maximal() {
    let artifacts = build();
    let sim = &artifacts.similarity;

    for i in 0..sim.len() {
        let row = sim.row(i).unwrap();
        let diagonal = row[i];
        assert_eq!(diagonal, 1.0);
        for (j, &value) in row.iter().enumerate() {
            assert!(
                (0.0..=1.0).contains(&value),
                "entry ({i}, {j}) = {value} out of range"
            );
            assert!(diagonal >= value);
        }
    }
}

#[test]
fn test_rows_follow_dataset_order() {
    let artifacts = build();
    assert_eq!(artifacts.features.len(), artifacts.catalog.len());
    assert_eq!(artifacts.catalog.movie_at(0).unwrap().title, "Interstellar");

    let first = artifacts.catalog.movie_at(0).unwrap();
    assert_eq!(artifacts.builder.transform(first), artifacts.features.rows[0]);
}

#[test]
fn test_related_movies_score_higher() {
    let artifacts = build();
    let catalog = &artifacts.catalog;
    let pos = |id| catalog.position(id).unwrap();

    // The two Godfather films against The Godfather and a cartoon
    let godfather = pos(238);
    let sequel = pos(240);
    let toy_story = pos(862);
    let sim = &artifacts.similarity;
    assert!(sim.get(godfather, sequel).unwrap() > sim.get(godfather, toy_story).unwrap());
}

#[test]
fn test_build_is_deterministic() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    build().save(first.path()).unwrap();
    build().save(second.path()).unwrap();

    for file in REQUIRED_FILES {
        let a = std::fs::read(first.path().join(file)).unwrap();
        let b = std::fs::read(second.path().join(file)).unwrap();
        assert!(a == b, "{file} differs between builds");
    }
}

#[test]
fn test_reload_matches_build() {
    let dir = tempfile::tempdir().unwrap();
    let built = build();
    built.save(dir.path()).unwrap();
    assert!(dir.path().join(FEATURES_FILE).exists());
    assert!(dir.path().join(SIMILARITY_FILE).exists());

    let loaded = ArtifactSet::load(dir.path()).unwrap();
    assert_eq!(loaded.similarity, built.similarity);
    assert_eq!(loaded.metadata, built.metadata);
    assert_eq!(loaded.catalog.len(), 32);
}
