//! Core traits for the filtering stage.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to candidate sets.

use crate::error::Result;
use crate::types::{Candidate, UserContext};

/// Core trait for filtering candidates.
///
/// Every source runs its raw candidates through a [`FilterPipeline`] built
/// from these.
///
/// ## Contract
/// - Filters take ownership of the candidate list and return what survives
/// - Survivors keep their relative order, so ranking done before filtering
///   stays valid
/// - `Send + Sync` so sources holding filters can be shared across threads
///
/// [`FilterPipeline`]: crate::filter_pipeline::FilterPipeline
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter (takes ownership)
    /// * `context` - The requesting user's ratings and genre preferences
    ///
    /// # Returns
    /// * `Ok(Vec<Candidate>)` - The candidates that pass, in input order
    /// * `Err` - If filtering fails
    fn apply(&self, candidates: Vec<Candidate>, context: &UserContext) -> Result<Vec<Candidate>>;
}
