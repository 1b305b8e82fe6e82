// Model exports
pub mod domain;
pub mod lenient;
pub mod requests;
pub mod responses;

pub use domain::{
    BayesianPrior, CandidateRecords, GeoPoint, ListingRecord, ListingSummary, MediaItem, MediaKind,
    MediaRecord, PopularityWeights, ProfileId, ProviderRecord, RankedResult, RelevanceWeights,
    ReviewRecord, SearchableProfile,
};
pub use requests::{
    ActivityLevel, FilterCriteria, MasterLevel, PriceField, SearchRequest, SortDirection, SortKey,
    SortSpec,
};
pub use responses::{CsvRow, GeoResult, QuickResult, SearchPage, SimilarResult};
