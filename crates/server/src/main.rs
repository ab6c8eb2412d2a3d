//! REST server for the recommender.
//!
//! Loads the artifact set once at startup and serves JSON over HTTP. Run
//! `cinematch build` first; the server does not build artifacts itself.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use data_loader::RatingStore;
use server::{router, AppState, Config, Recommender};

#[derive(Parser)]
#[command(name = "cinematch-server")]
#[command(about = "Serve movie recommendations over HTTP")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artifact directory (overrides the config file)
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Rating store file (overrides the config file)
    #[arg(long)]
    ratings: Option<PathBuf>,

    /// Host to bind the server to (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the server to (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(artifacts) = args.artifacts {
        config.paths.artifacts = artifacts;
    }
    if let Some(ratings) = args.ratings {
        config.paths.ratings = ratings;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Starting cinematch server");
    let recommender = Recommender::load(&config).context("Failed to load recommender")?;
    let ratings = RatingStore::open(&config.paths.ratings).context("Failed to open rating store")?;
    info!(
        "Rating store {} holds {} ratings",
        config.paths.ratings.display(),
        ratings.len()
    );

    let app = router(AppState::new(recommender, ratings));

    let addr = format!("{}:{}", config.server.host, config.server.port)
        .parse::<SocketAddr>()
        .context("Invalid address")?;

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
