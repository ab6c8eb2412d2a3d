//! Parser for the movie dataset.
//!
//! The dataset is a JSON array of objects as produced by the TMDB export:
//!
//! ```text
//! { "id": 157336, "title": "Interstellar", "genres": ["Adventure", "Drama"],
//!   "overview": "...", "release_date": "2014-11-05",
//!   "vote_average": 8.4, "vote_count": 32000 }
//! ```
//!
//! Parsing is lenient per row. A row without a usable `id` or `title` is
//! skipped with a warning. Optional fields that are missing or malformed
//! become empty/absent values. Only an unreadable file, or a top-level value
//! that is not an array, fails the whole load.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::NaiveDate;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Parse the dataset file at `path`
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    parse_movies_str(&content, &path.display().to_string())
}

/// Parse dataset JSON held in memory. `file` is only used in messages.
pub fn parse_movies_str(content: &str, file: &str) -> Result<Vec<Movie>> {
    let root: Value = serde_json::from_str(content).map_err(|e| DataLoadError::MalformedFile {
        file: file.to_string(),
        reason: e.to_string(),
    })?;

    let rows = root.as_array().ok_or_else(|| DataLoadError::MalformedFile {
        file: file.to_string(),
        reason: "expected a top-level array of movie objects".to_string(),
    })?;

    let mut movies = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        match parse_movie_row(row) {
            Ok(movie) => movies.push(movie),
            Err(reason) => warn!("Skipping row {} in {}: {}", idx + 1, file, reason),
        }
    }
    Ok(movies)
}

/// Convert one JSON row into a Movie, or explain why it can't be used
fn parse_movie_row(row: &Value) -> std::result::Result<Movie, String> {
    let obj = row.as_object().ok_or("row is not an object")?;

    let id = obj
        .get("id")
        .and_then(parse_id)
        .ok_or("missing or invalid id")?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("missing title")?
        .to_string();

    let overview = obj
        .get("overview")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let genres = obj.get("genres").map(parse_genres).unwrap_or_default();

    let vote_average = obj
        .get("vote_average")
        .and_then(parse_number)
        .filter(|v| (0.0..=f64::from(MAX_RATING)).contains(v))
        .map(|v| v as f32);

    let vote_count = obj
        .get("vote_count")
        .and_then(parse_number)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| v.round() as u32);

    let release_date = obj
        .get("release_date")
        .and_then(Value::as_str)
        .and_then(parse_release_date);

    Ok(Movie {
        id,
        title,
        genres,
        overview,
        vote_average,
        vote_count,
        release_date,
    })
}

/// Ids arrive as numbers, occasionally as numeric strings
fn parse_id(value: &Value) -> Option<MovieId> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| MovieId::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parse a genre list.
///
/// Accepts `["Drama", ...]`, raw TMDB `[{"id": 18, "name": "Drama"}, ...]`,
/// or a single `"Drama"` string. Unknown names are dropped; duplicates keep
/// their first position.
fn parse_genres(value: &Value) -> Vec<Genre> {
    let names: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(o) => o.get("name").and_then(Value::as_str),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut genres = Vec::new();
    for name in names {
        match Genre::parse(name) {
            Some(genre) if !genres.contains(&genre) => genres.push(genre),
            Some(_) => {}
            None if name.trim().is_empty() => {}
            None => debug!("Ignoring unknown genre {:?}", name),
        }
    }
    genres
}

/// Extract a release date
///
/// Example: "2014-11-05" -> Some(2014-11-05)
///          "" -> None
fn parse_release_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}
