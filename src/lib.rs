//! Provider Search - search, ranking and faceting engine for a service
//! provider directory
//!
//! The engine works on a value-typed candidate query: composable filters
//! narrow it, composable sorters rank it, and facets count over clones of it.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    FacetDimension, FacetResult, FilterSet, ProfileQuery, QueryBuilder, ResultFormatter,
    SearchEngine, SorterSet,
};
pub use error::{SearchError, SearchResult};
pub use models::{
    CandidateRecords, FilterCriteria, GeoPoint, RankedResult, SearchRequest, SearchableProfile,
    SortSpec,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let bbox = crate::core::calculate_bounding_box(55.7558, 37.6173, 10.0);
        assert!(bbox.min_lat < 55.7558);

        let engine = SearchEngine::default();
        let base = engine.base_query(&CandidateRecords::default(), chrono::Utc::now());
        assert!(base.is_empty());
    }
}
