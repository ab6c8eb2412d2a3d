//! Filter implementations for the candidate pipeline.

pub mod already_rated;
pub mod exclude;
pub mod genre_match;

// Re-export for convenience
pub use already_rated::AlreadyRatedFilter;
pub use exclude::ExcludeMoviesFilter;
pub use genre_match::GenreMatchFilter;
