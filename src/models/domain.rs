use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Profile identifier as stored by the profile-management service
pub type ProfileId = u64;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Avatar,
    Portfolio,
    Other,
}

/// Media attached to a profile (avatar, portfolio photos)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
}

/// Active, published listing owned by a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: u64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub metro_station: Option<String>,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

/// Provider profile as seen by the search engine
///
/// The aggregate columns (`listing_count`, `review_count`, `rating`) and the
/// `listings`/`media` collections are filled in by
/// [`QueryBuilder::base_query`](crate::core::QueryBuilder::base_query).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchableProfile {
    pub id: ProfileId,
    pub name: String,
    pub specialty: Option<String>,
    pub description: Option<String>,
    pub services_description: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub address: Option<String>,
    pub metro_stations: Vec<String>,
    pub location: Option<GeoPoint>,
    pub min_price: Option<f64>,
    /// Average review rating, `None` when the profile has no reviews
    pub rating: Option<f64>,
    pub review_count: u32,
    pub listing_count: u32,
    pub experience_years: Option<u32>,
    pub is_verified: bool,
    pub is_premium: bool,
    pub is_available: bool,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Comma separated list, e.g. `"русский, english"`
    pub languages: Option<String>,
    pub category_id: Option<u64>,
    pub category_ids: Vec<u64>,
    pub category_type: Option<String>,
    pub certificate_count: u32,
    pub views_count: u64,
    pub bookings_count: u64,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub listings: Vec<ListingSummary>,
    pub media: Vec<MediaItem>,
}

impl SearchableProfile {
    pub fn avatar_url(&self) -> Option<&str> {
        self.media
            .iter()
            .find(|m| m.kind == MediaKind::Avatar)
            .map(|m| m.url.as_str())
    }

    pub fn has_portfolio(&self) -> bool {
        self.media.iter().any(|m| m.kind == MediaKind::Portfolio)
    }

    /// Categories linked directly or through any listing
    pub fn all_category_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.category_id
            .into_iter()
            .chain(self.category_ids.iter().copied())
            .chain(self.listings.iter().filter_map(|l| l.category_id))
    }
}

/// Raw profile row as delivered by a [`ProfileStore`](crate::services::ProfileStore)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(flatten)]
    pub profile: SearchableProfile,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_provider: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingRecord {
    pub profile_id: ProfileId,
    #[serde(flatten)]
    pub listing: ListingSummary,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub profile_id: ProfileId,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub profile_id: ProfileId,
    #[serde(flatten)]
    pub media: MediaItem,
}

/// Everything needed to build the base candidate set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateRecords {
    pub profiles: Vec<ProviderRecord>,
    pub listings: Vec<ListingRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub media: Vec<MediaRecord>,
}

/// A profile plus the scores attached by whichever stage produced them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub profile: Arc<SearchableProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<f64>,
}

impl RankedResult {
    pub fn new(profile: impl Into<Arc<SearchableProfile>>) -> Self {
        Self {
            profile: profile.into(),
            relevance_score: None,
            similarity_score: None,
            distance_km: None,
            popularity_score: None,
        }
    }

    pub fn id(&self) -> ProfileId {
        self.profile.id
    }
}

/// Bayesian prior used for smoothed rating ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BayesianPrior {
    /// `m`: the number of votes needed before a profile's own rating dominates
    pub min_votes: f64,
    /// `C`: the fixed prior mean, not derived from the population
    pub prior_mean: f64,
}

impl BayesianPrior {
    /// `(R·v + m·C) / (v + m)`
    #[inline]
    pub fn smooth(&self, rating: f64, votes: f64) -> f64 {
        let denominator = votes + self.min_votes;
        if denominator <= 0.0 {
            return rating;
        }
        (rating * votes + self.min_votes * self.prior_mean) / denominator
    }
}

impl Default for BayesianPrior {
    fn default() -> Self {
        Self {
            min_votes: 3.0,
            prior_mean: 3.5,
        }
    }
}

/// Popularity factor weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopularityWeights {
    pub views: f64,
    pub bookings: f64,
    pub reviews: f64,
    pub rating: f64,
}

impl Default for PopularityWeights {
    fn default() -> Self {
        Self {
            views: 0.1,
            bookings: 0.4,
            reviews: 0.3,
            rating: 0.2,
        }
    }
}

/// Per-field weights used for text relevance scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    pub name: f64,
    pub specialty: f64,
    pub description: f64,
    pub city: f64,
    pub services_description: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            name: 4.0,
            specialty: 3.5,
            description: 2.5,
            city: 2.0,
            services_description: 2.2,
        }
    }
}
