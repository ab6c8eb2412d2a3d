use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use data_loader::{normalize_user, Movie, MovieId, RatingStore, TitleLookup, TitleMatch};
use serde::Serialize;
use server::{
    build_artifacts, train_collaborative, Analytics, Config, Recommendation, Recommender,
    TitleOutcome,
};
use sources::{EvaluationReport, UserProfile};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Cinematch - content-based and hybrid movie recommendations
#[derive(Parser)]
#[command(name = "cinematch")]
#[command(about = "Movie recommendations from plot, genre and rating similarity", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Artifact directory (overrides the config file)
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Rating store file (overrides the config file)
    #[arg(long, global = true)]
    ratings: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A movie given either by title or by id
#[derive(Args, Debug)]
#[group(multiple = false)]
struct MovieRef {
    /// Movie title (case-insensitive)
    #[arg(long)]
    title: Option<String>,

    /// Movie id
    #[arg(long)]
    id: Option<MovieId>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build features and the similarity matrix from the dataset
    Build {
        /// Dataset file (overrides the config file)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Movies similar to a given movie
    Recommend {
        #[command(flatten)]
        movie: MovieRef,

        /// Number of recommendations to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Best rated movies in a genre
    Genre {
        /// Genre name or part of one
        name: String,

        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Random movies from the catalog
    Random {
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },

    /// Catalog and build statistics
    Stats,

    /// Show one movie
    Info {
        /// Movie id
        id: MovieId,
    },

    /// Manage user ratings
    Rate {
        #[command(subcommand)]
        action: RateAction,
    },

    /// Summarize a user's ratings
    Profile {
        #[arg(long)]
        user: String,
    },

    /// Fit the collaborative model on the rating store
    Train,

    /// Rating store totals and the best rated movies
    Analytics,

    /// Precision and recall of hybrid recommendations against hidden ratings
    Evaluate {
        #[arg(long)]
        user: String,

        /// Movies to hide from the user's ratings and look for
        #[arg(long = "held-out", num_args = 1.., required = true)]
        held_out: Vec<MovieId>,

        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Recommendations for a user, blending content and collaborative scores
    Hybrid {
        #[arg(long)]
        user: String,

        /// Optional seed movie
        #[command(flatten)]
        seed: MovieRef,

        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum RateAction {
    /// Add or replace a rating (0-10)
    Add {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: MovieId,
        #[arg(long)]
        score: f32,
    },

    /// Remove a rating
    Remove {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: MovieId,
    },

    /// List a user's ratings, or a summary of the store without --user
    List {
        #[arg(long)]
        user: Option<String>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let json = cli.json;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Build { dataset } => handle_build(config, dataset),
        Commands::Train => handle_train(&config, json),
        Commands::Rate { action } => handle_rate(&config, action, json),
        Commands::Recommend { movie, limit } => {
            handle_recommend(&load_recommender(&config)?, movie, limit, json)
        }
        Commands::Genre { name, limit } => {
            handle_genre(&load_recommender(&config)?, &name, limit, json)
        }
        Commands::Random { limit } => handle_random(&load_recommender(&config)?, limit, json),
        Commands::Stats => handle_stats(&load_recommender(&config)?, json),
        Commands::Info { id } => handle_info(&load_recommender(&config)?, id, json),
        Commands::Profile { user } => {
            handle_profile(&config, &load_recommender(&config)?, &user, json)
        }
        Commands::Analytics => handle_analytics(&config, &load_recommender(&config)?, json),
        Commands::Evaluate { user, held_out, limit } => {
            handle_evaluate(&config, &load_recommender(&config)?, &user, &held_out, limit, json)
        }
        Commands::Hybrid { user, seed, limit } => {
            handle_hybrid(&config, &load_recommender(&config)?, &user, seed, limit, json)
        }
    }
}

fn load_recommender(config: &Config) -> Result<Recommender> {
    let start = Instant::now();
    let recommender = Recommender::load(config).context("Failed to load artifacts")?;
    debug!("Loaded recommender in {:.2?}", start.elapsed());
    Ok(recommender)
}

/// Config file values with command-line overrides applied
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(artifacts) = &cli.artifacts {
        config.paths.artifacts = artifacts.clone();
    }
    if let Some(ratings) = &cli.ratings {
        config.paths.ratings = ratings.clone();
    }
    Ok(config)
}

/// Handle the 'build' command
fn handle_build(mut config: Config, dataset: Option<PathBuf>) -> Result<()> {
    if let Some(dataset) = dataset {
        config.paths.dataset = dataset;
    }
    println!("Building artifacts from {}...", config.paths.dataset.display());

    let start = Instant::now();
    let artifacts = build_artifacts(&config).context("Build failed")?;
    let dims = artifacts.metadata.dimensions;

    println!("{} Built artifacts in {:.2?}", "✓".green(), start.elapsed());
    println!("{}Movies: {}", "• ".cyan(), artifacts.catalog.len());
    println!(
        "{}Features: {} (text {}, genre {}, numeric {})",
        "• ".cyan(),
        artifacts.metadata.feature_dim,
        dims.text,
        dims.genre,
        dims.numeric
    );
    match artifacts.metadata.svd_components {
        Some(components) => println!(
            "{}Reduced to {} dimensions with truncated SVD",
            "• ".cyan(),
            components
        ),
        None => println!("{}No dimensionality reduction", "• ".cyan()),
    }
    println!("{}Saved to {}", "• ".cyan(), config.paths.artifacts.display());
    Ok(())
}

/// Handle the 'train' command
fn handle_train(config: &Config, json: bool) -> Result<()> {
    let store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;
    ensure!(
        !store.is_empty(),
        "No ratings in {}. Add some with `cinematch rate add` first.",
        config.paths.ratings.display()
    );

    let report = train_collaborative(config, &store).context("Training failed")?;
    if json {
        return print_json(&report);
    }
    println!("{} Trained collaborative model", "✓".green());
    println!(
        "{}{} users, {} movies, {} ratings",
        "• ".cyan(),
        report.users,
        report.movies,
        report.ratings
    );
    println!("{}Rank {}, training RMSE {:.3}", "• ".cyan(), report.rank, report.rmse);
    Ok(())
}

/// Handle the 'rate' subcommands
fn handle_rate(config: &Config, action: RateAction, json: bool) -> Result<()> {
    let mut store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;

    match action {
        RateAction::Add { user, id, score } => {
            let movie = load_recommender(config)?
                .movie(id)
                .ok_or_else(|| anyhow!("Movie {} not found", id))?;
            let change = add_rating(&mut store, &user, id, score)?;
            if json {
                return print_json(&change);
            }
            match change.previous {
                Some(old) => println!(
                    "{} Updated {}'s rating for {} from {:.1} to {:.1}",
                    "✓".green(),
                    change.user_id,
                    movie.title.bold(),
                    old,
                    score
                ),
                None => println!(
                    "{} {} rated {} {:.1}",
                    "✓".green(),
                    change.user_id,
                    movie.title.bold(),
                    score
                ),
            }
        }
        RateAction::Remove { user, id } => {
            let change = remove_rating(&mut store, &user, id)?;
            if json {
                return print_json(&change);
            }
            println!(
                "{} Removed {}'s rating for movie {}",
                "✓".green(),
                change.user_id,
                id
            );
        }
        RateAction::List { user: Some(user) } => {
            let ratings = store.user_ratings(&user);
            if json {
                return print_json(&ratings);
            }
            println!("{}", format!("Ratings by {}:", user).bold().blue());
            if ratings.is_empty() {
                println!("  (none)");
            }
            for rating in ratings {
                println!("  {:>8}  {:.1}", rating.movie_id, rating.score);
            }
        }
        RateAction::List { user: None } => {
            let summary = store.summary();
            if json {
                return print_json(&summary);
            }
            println!("{}", "Rating store:".bold().blue());
            println!("{}Users: {}", "• ".cyan(), summary.users);
            println!("{}Ratings: {}", "• ".cyan(), summary.ratings);
            println!("{}Mean score: {:.2}", "• ".cyan(), summary.mean_score);
            for user in store.users() {
                println!("  - {}", user);
            }
        }
    }
    Ok(())
}

/// Outcome of a rating write
#[derive(Debug, Serialize, PartialEq)]
struct RatingChange {
    user_id: String,
    movie_id: MovieId,
    /// `None` when the rating was removed
    score: Option<f32>,
    previous: Option<f32>,
}

/// Upsert and save; the store is untouched if the save fails
fn add_rating(store: &mut RatingStore, user: &str, id: MovieId, score: f32) -> Result<RatingChange> {
    let mut updated = store.clone();
    let previous = updated.upsert(user, id, score)?;
    updated.save().context("Failed to save rating store")?;
    *store = updated;
    Ok(RatingChange {
        user_id: normalize_user(user).to_string(),
        movie_id: id,
        score: Some(score),
        previous,
    })
}

/// Remove and save; the store is untouched if the save fails
fn remove_rating(store: &mut RatingStore, user: &str, id: MovieId) -> Result<RatingChange> {
    let previous = store.get(user, id);
    let mut updated = store.clone();
    if !updated.remove(user, id) {
        bail!("{} has no rating for movie {}", normalize_user(user), id);
    }
    updated.save().context("Failed to save rating store")?;
    *store = updated;
    Ok(RatingChange {
        user_id: normalize_user(user).to_string(),
        movie_id: id,
        score: None,
        previous,
    })
}

/// Handle the 'recommend' command
fn handle_recommend(recommender: &Recommender, movie: MovieRef, limit: usize, json: bool) -> Result<()> {
    ensure!(limit > 0, "limit must be at least 1");

    let (query, recommendations) = match (movie.title, movie.id) {
        (Some(title), _) => match recommender.recommend_by_title(&title, limit)? {
            TitleOutcome::Matched { movie, recommendations } => (movie, recommendations),
            TitleOutcome::Ambiguous(candidates) => {
                print_title_matches(&format!("'{}' matches several movies:", title), &candidates);
                bail!("Ambiguous title; pick one and use --id");
            }
            TitleOutcome::NotFound { suggestions } => {
                print_title_matches("Did you mean:", &suggestions);
                bail!("No movie titled '{}'", title);
            }
        },
        (None, Some(id)) => {
            let movie = recommender
                .movie(id)
                .ok_or_else(|| anyhow!("Movie {} not found", id))?;
            (movie, recommender.recommend_by_id(id, limit)?)
        }
        (None, None) => bail!("Give a movie with --title or --id"),
    };

    if json {
        return print_json(&recommendations);
    }
    println!(
        "{}",
        format!("Because you liked {}:", display_title(&query)).bold().blue()
    );
    print_recommendations(&recommendations);
    Ok(())
}

/// Handle the 'genre' command
fn handle_genre(recommender: &Recommender, name: &str, limit: usize, json: bool) -> Result<()> {
    ensure!(limit > 0, "limit must be at least 1");
    let movies = recommender.search_by_genre(name, limit)?;
    if json {
        return print_json(&movies);
    }
    if movies.is_empty() {
        println!("No movies match genre '{}'. Known genres:", name);
        for genre in recommender.genres() {
            println!("  - {}", genre);
        }
        return Ok(());
    }
    println!("{}", format!("Top {} movies:", name).bold().blue());
    for (rank, rec) in movies.iter().enumerate() {
        println!(
            "{}. {} [{}] - Rating: {}",
            (rank + 1).to_string().green(),
            display_title(&rec.movie),
            rec.movie.genre_names(),
            display_rating(&rec.movie)
        );
    }
    Ok(())
}

/// Handle the 'random' command
fn handle_random(recommender: &Recommender, limit: usize, json: bool) -> Result<()> {
    ensure!(limit > 0, "limit must be at least 1");
    let movies = recommender.random(limit);
    if json {
        return print_json(&movies);
    }
    println!("{}", "Random picks:".bold().blue());
    for movie in &movies {
        println!(
            "{}{} [{}] - Rating: {}",
            "• ".green(),
            display_title(movie),
            movie.genre_names(),
            display_rating(movie)
        );
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(recommender: &Recommender, json: bool) -> Result<()> {
    let stats = recommender.stats();
    if json {
        return print_json(&stats);
    }
    println!("{}", "Catalog statistics:".bold().blue());
    println!("{}Movies: {}", "• ".cyan(), stats.total_movies);
    println!("{}Average rating: {:.2}", "• ".cyan(), stats.average_rating);
    println!(
        "{}Feature dimensions: {} (text {}, genre {}, numeric {})",
        "• ".cyan(),
        stats.feature_dim,
        stats.dimensions.text,
        stats.dimensions.genre,
        stats.dimensions.numeric
    );
    if let Some(components) = stats.svd_components {
        println!("{}SVD components: {}", "• ".cyan(), components);
    }
    println!(
        "{}Collaborative model: {}",
        "• ".cyan(),
        if stats.collaborative_model { "trained" } else { "not trained" }
    );
    println!("{}Genres: {}", "• ".cyan(), stats.genres.join(", "));
    Ok(())
}

/// Handle the 'info' command
fn handle_info(recommender: &Recommender, id: MovieId, json: bool) -> Result<()> {
    let movie = recommender
        .movie(id)
        .ok_or_else(|| anyhow!("Movie {} not found", id))?;
    if json {
        return print_json(&movie);
    }
    println!("{}", display_title(&movie).bold().blue());
    println!("{}Id: {}", "• ".green(), movie.id);
    println!("{}Genres: {}", "• ".green(), movie.genre_names());
    println!(
        "{}Rating: {} ({} votes)",
        "• ".green(),
        display_rating(&movie),
        movie.vote_count.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string())
    );
    if let Some(date) = movie.release_date {
        println!("{}Released: {}", "• ".green(), date);
    }
    if !movie.overview.is_empty() {
        println!();
        println!("{}", movie.overview);
    }
    Ok(())
}

/// Handle the 'profile' command
fn handle_profile(config: &Config, recommender: &Recommender, user: &str, json: bool) -> Result<()> {
    let store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;
    let profile = recommender.user_profile(&store, user);
    if json {
        return print_json(&profile);
    }
    print_profile(&profile);
    Ok(())
}

/// Handle the 'hybrid' command
fn handle_hybrid(
    config: &Config,
    recommender: &Recommender,
    user: &str,
    seed: MovieRef,
    limit: usize,
    json: bool,
) -> Result<()> {
    ensure!(limit > 0, "limit must be at least 1");
    let store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;

    let seed_id = match (seed.title, seed.id) {
        (Some(title), _) => Some(resolve_title(recommender, &title)?),
        (None, id) => id,
    };

    let context = recommender.user_context(&store, user);
    let recommendations = recommender.hybrid(&context, seed_id, limit)?;
    if json {
        return print_json(&recommendations);
    }

    let header = match seed_id.and_then(|id| recommender.movie(id)) {
        Some(movie) => format!("For {}, starting from {}:", user, display_title(&movie)),
        None => format!("For {}:", user),
    };
    println!("{}", header.bold().blue());
    if !recommender.has_model() {
        println!(
            "{}",
            "(no collaborative model; scores are content-only. Run `cinematch train`.)".yellow()
        );
    }
    print_recommendations(&recommendations);
    Ok(())
}

/// Handle the 'analytics' command
fn handle_analytics(config: &Config, recommender: &Recommender, json: bool) -> Result<()> {
    let store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;
    let analytics = recommender.analytics(&store);
    if json {
        return print_json(&analytics);
    }
    print_analytics(&analytics);
    Ok(())
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    config: &Config,
    recommender: &Recommender,
    user: &str,
    held_out: &[MovieId],
    limit: usize,
    json: bool,
) -> Result<()> {
    ensure!(limit > 0, "limit must be at least 1");
    let store = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;
    let report = recommender.evaluate(&store, user, held_out, limit)?;
    if json {
        return print_json(&report);
    }
    print_evaluation(normalize_user(user), &report);
    Ok(())
}

/// Title to id, printing candidates when the title does not resolve
fn resolve_title(recommender: &Recommender, title: &str) -> Result<MovieId> {
    match recommender.artifacts().catalog.find_by_title(title) {
        TitleLookup::Resolved(id) => Ok(id),
        TitleLookup::Ambiguous(candidates) => {
            print_title_matches(&format!("'{}' matches several movies:", title), &candidates);
            bail!("Ambiguous title; pick one and use --id")
        }
        TitleLookup::NotFound(suggestions) => {
            print_title_matches("Did you mean:", &suggestions);
            bail!("No movie titled '{}'", title)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_title(movie: &Movie) -> String {
    match movie.year() {
        Some(year) => format!("{} ({})", movie.title, year),
        None => movie.title.clone(),
    }
}

fn display_rating(movie: &Movie) -> String {
    movie
        .vote_average
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn print_title_matches(header: &str, matches: &[TitleMatch]) {
    if matches.is_empty() {
        return;
    }
    println!("{}", header.yellow());
    for m in matches {
        println!("  {:>8}  {}", m.movie_id, m.title);
    }
}

/// Helper function to format and print recommendations
fn print_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        println!("  (no recommendations)");
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] - Score: {:.3}",
            (rank + 1).to_string().green(),
            display_title(&rec.movie),
            rec.movie.genre_names(),
            rec.score
        );
        if let (Some(content), Some(predicted)) =
            (rec.metadata.content_score, rec.metadata.predicted_score)
        {
            match rec.metadata.neighbor_score {
                Some(neighbor) => println!(
                    "   content {:.2}, predicted {:.2} (similar users {:.2})",
                    content, predicted, neighbor
                ),
                None => println!("   content {:.2}, predicted {:.2}", content, predicted),
            }
        }
    }
}

fn print_analytics(analytics: &Analytics) {
    println!("{}", "Rating analytics:".bold().blue());
    println!("{}Users: {}", "• ".cyan(), analytics.total_users);
    println!("{}Ratings: {}", "• ".cyan(), analytics.total_ratings);
    println!("{}Average rating: {:.2}", "• ".cyan(), analytics.average_rating);
    if analytics.top_rated_movies.is_empty() {
        return;
    }
    println!("Top rated movies:");
    for (rank, movie) in analytics.top_rated_movies.iter().enumerate() {
        let title = if movie.title.is_empty() {
            format!("movie {}", movie.stats.movie_id)
        } else {
            movie.title.clone()
        };
        println!(
            "{}. {} - {:.2} ({} ratings)",
            (rank + 1).to_string().green(),
            title,
            movie.stats.average,
            movie.stats.count
        );
    }
}

fn print_evaluation(user: &str, report: &EvaluationReport) {
    println!("{}", format!("Evaluation for {}:", user).bold().blue());
    println!(
        "{}Hits: {} of {} held out, {} recommended",
        "• ".cyan(),
        report.hits,
        report.total_held_out,
        report.total_recommendations
    );
    println!("{}Precision: {:.3}", "• ".cyan(), report.precision);
    println!("{}Recall: {:.3}", "• ".cyan(), report.recall);
    println!("{}F1: {:.3}", "• ".cyan(), report.f1_score);
}

fn print_profile(profile: &UserProfile) {
    println!("{}", format!("User: {}", profile.user_id).bold().blue());
    if profile.rating_count == 0 {
        println!("  No ratings yet. Add some with `cinematch rate add`.");
        return;
    }
    println!("{}Number of ratings: {}", "• ".cyan(), profile.rating_count);
    println!("{}Average rating: {:.2}", "• ".cyan(), profile.mean_rating);

    println!("Top rated movies:");
    for movie in &profile.top_rated {
        let title = if movie.title.is_empty() {
            format!("movie {}", movie.movie_id)
        } else {
            movie.title.clone()
        };
        println!("  - {} (Rating: {:.1})", title, movie.score);
    }

    println!("Genre preferences:");
    for genre in &profile.genres {
        println!(
            "  - {}: Average Rating: {:.2} ({} ratings, preference {:.2})",
            genre.genre.name(),
            genre.average_rating,
            genre.count,
            genre.preference_score
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_title_and_id_conflict() {
        let parsed = Cli::try_parse_from(["cinematch", "recommend", "--title", "Heat", "--id", "949"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "cinematch",
            "stats",
            "--artifacts",
            "/tmp/cm-artifacts",
            "--ratings",
            "/tmp/cm-ratings.json",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.paths.artifacts, PathBuf::from("/tmp/cm-artifacts"));
        assert_eq!(config.paths.ratings, PathBuf::from("/tmp/cm-ratings.json"));
        assert_eq!(config.paths.dataset, Config::default().paths.dataset);
    }

    #[test]
    fn test_hybrid_arguments() {
        let cli = Cli::try_parse_from(["cinematch", "hybrid", "--user", "alice", "-n", "3"]).unwrap();
        match cli.command {
        Commands::Hybrid { user, seed, limit } => {
                assert_eq!(user, "alice");
                assert_eq!(limit, 3);
                assert!(seed.title.is_none() && seed.id.is_none());
            }
            _ => panic!("expected hybrid"),
        }
    }

    #[test]
    fn test_evaluate_arguments() {
        let cli = Cli::try_parse_from([
            "cinematch", "evaluate", "--user", "alice", "--held-out", "157336", "27205",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate { user, held_out, limit } => {
                assert_eq!(user, "alice");
                assert_eq!(held_out, vec![157336, 27205]);
                assert_eq!(limit, 20);
            }
            _ => panic!("expected evaluate"),
        }
        assert!(Cli::try_parse_from(["cinematch", "evaluate", "--user", "alice"]).is_err());
    }

    #[test]
    fn test_rating_changes_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RatingStore::new(dir.path().join("ratings.json"));

        let added = add_rating(&mut store, " alice ", 238, 8.0).unwrap();
        assert_eq!(added.user_id, "alice");
        let json = serde_json::to_value(&added).unwrap();
        assert_eq!(json["movie_id"], 238);
        assert_eq!(json["score"], 8.0);
        assert!(json["previous"].is_null());

        let updated = add_rating(&mut store, "alice", 238, 6.0).unwrap();
        assert_eq!(updated.previous, Some(8.0));

        let removed = remove_rating(&mut store, "alice", 238).unwrap();
        assert_eq!(removed.score, None);
        assert_eq!(removed.previous, Some(6.0));
        assert!(RatingStore::open(dir.path().join("ratings.json")).unwrap().is_empty());
        assert!(remove_rating(&mut store, "alice", 238).is_err());
    }

    #[test]
    fn test_failed_save_keeps_store() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut store = RatingStore::new(blocker.join("ratings.json"));

        assert!(add_rating(&mut store, "alice", 238, 8.0).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_random_rejects_zero_limit() {
        let dataset = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../data/movies_dataset.json");
        let artifacts_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.dataset = dataset;
        config.paths.artifacts = artifacts_dir.path().to_path_buf();
        build_artifacts(&config).unwrap();

        let recommender = Recommender::load(&config).unwrap();
        assert!(handle_random(&recommender, 0, true).is_err());
        assert!(handle_random(&recommender, 2, true).is_ok());
    }
}
