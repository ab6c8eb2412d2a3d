//! The FilterPipeline chains multiple filters.
//!
//! Sources build one per query with the builder pattern and run every raw
//! candidate list through it before ranking or truncating.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use tracing::debug;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(ExcludeMoviesFilter::new([seed_id]))
///     .add_filter(AlreadyRatedFilter);
///
/// let filtered = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create an empty pipeline; applying it returns the input unchanged
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    ///
    /// # Arguments
    /// * `filter` - Any type implementing the Filter trait
    ///
    /// # Returns
    /// Self for method chaining
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Apply all filters in sequence.
    ///
    /// ## Algorithm
    /// 1. Start with the input candidates
    /// 2. For each filter, in the order it was added:
    ///    a. Apply the filter to the survivors of the previous one
    ///    b. Log the filter name with the input and output counts
    /// 3. Return the final set
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter
    /// * `context` - User context passed to every filter
    ///
    /// # Returns
    /// * `Ok(Vec<Candidate>)` - The candidates that passed every filter
    /// * `Err` - The first filter error; later filters do not run
    pub fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context)?;
            debug!("{}: {} -> {} candidates", filter.name(), before, current.len());
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{AlreadyRatedFilter, ExcludeMoviesFilter};
    use crate::types::CandidateSource;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new(1, CandidateSource::Content, 0.9),
            Candidate::new(2, CandidateSource::Content, 0.8),
            Candidate::new(3, CandidateSource::Content, 0.7),
        ]
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = UserContext::new("alice");
        let filtered = pipeline.apply(candidates(), &context).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_filters_compose() {
        let mut context = UserContext::new("alice");
        context.rated_movies.insert(1);

        let pipeline = FilterPipeline::new()
            .add_filter(ExcludeMoviesFilter::new([3]))
            .add_filter(AlreadyRatedFilter);

        let filtered = pipeline.apply(candidates(), &context).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].movie_id, 2);
    }
}
