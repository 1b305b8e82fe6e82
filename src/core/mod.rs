// Core algorithm exports
pub mod builder;
pub mod distance;
pub mod engine;
pub mod facets;
pub mod filters;
pub mod formatter;
pub mod query;
pub mod sorters;

use std::collections::BTreeMap;

/// Named parameters reported by filters and sorters
pub type Params = BTreeMap<String, serde_json::Value>;

pub use builder::QueryBuilder;
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use engine::{EngineOptions, SearchEngine};
pub use facets::{FacetBucket, FacetCalculator, FacetDimension, FacetResult};
pub use filters::{Filter, FilterContext, FilterSet};
pub use formatter::ResultFormatter;
pub use query::{OrderTerm, ProfileQuery, SortField};
pub use sorters::{build_sorter, RankingOptions, Sorter, SorterSet};
