//! # Data Loader Crate
//!
//! This crate loads the movie dataset and manages user ratings.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Genre, MovieCatalog, UserRating)
//! - **parser**: Lenient JSON dataset parsing (bad rows are skipped)
//! - **index**: Catalog building, validation and title lookup
//! - **ratings**: The per-user rating store backing the collaborative signal
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{MovieCatalog, TitleLookup};
//! use std::path::Path;
//!
//! let catalog = MovieCatalog::load_from_file(Path::new("data/movies_dataset.json"))?;
//!
//! if let TitleLookup::Resolved(id) = catalog.find_by_title("interstellar") {
//!     println!("{}", catalog.get_movie(id).unwrap().title);
//! }
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;
pub mod ratings;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::{TitleLookup, TitleMatch};
pub use ratings::{normalize_user, MovieRatingStats, RatingStore, RatingSummary};
pub use types::{
    // Type aliases
    MovieId,
    UserId,
    // Core types
    Movie,
    MovieCatalog,
    UserRating,
    // Enums
    Genre,
    MAX_RATING,
};
