use crate::models::domain::{GeoPoint, PopularityWeights, ProfileId};
use crate::models::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Which price column the price filter and sorter read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// The profile's own `min_price` column
    #[default]
    MinPrice,
    /// Prices of the profile's active listings
    ListingPrice,
}

impl FromStr for PriceField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min_price" | "users.min_price" => Ok(Self::MinPrice),
            "listing_price" | "price" | "ads.price" => Ok(Self::ListingPrice),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinPrice => write!(f, "min_price"),
            Self::ListingPrice => write!(f, "listing_price"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterLevel {
    Top,
    Experienced,
    Newcomer,
}

impl FromStr for MasterLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "experienced" => Ok(Self::Experienced),
            "newcomer" => Ok(Self::Newcomer),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    VeryActive,
    Active,
    Inactive,
}

impl FromStr for ActivityLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "very_active" => Ok(Self::VeryActive),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(()),
        }
    }
}

/// Filter parameters parsed from the request layer
///
/// Each filter owns a disjoint subset of these fields. Malformed values are
/// read as absent, so a bad `price_range` simply leaves the price filter off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    // Location
    #[serde(deserialize_with = "lenient::text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub district: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub metro_station: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub radius: Option<f64>,

    // Price
    #[serde(alias = "price_from", deserialize_with = "lenient::number")]
    pub price_min: Option<f64>,
    #[serde(alias = "price_to", deserialize_with = "lenient::number")]
    pub price_max: Option<f64>,
    #[serde(deserialize_with = "lenient::range")]
    pub price_range: Option<(f64, f64)>,
    #[serde(deserialize_with = "lenient::flag")]
    pub include_null_prices: bool,
    #[serde(deserialize_with = "lenient::parsed")]
    pub price_field: Option<PriceField>,

    // Category
    #[serde(deserialize_with = "lenient::text")]
    pub specialty: Option<String>,
    #[serde(alias = "categories", deserialize_with = "lenient::id_list")]
    pub category_ids: Vec<u64>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub category_types: Vec<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub match_all: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub include_subcategories: bool,

    // Rating and reviews
    #[serde(alias = "min_rating", deserialize_with = "lenient::number")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    pub min_reviews: Option<u32>,

    // Experience, availability, quality
    #[serde(alias = "min_experience", deserialize_with = "lenient::count")]
    pub experience: Option<u32>,
    #[serde(alias = "available_now", deserialize_with = "lenient::flag")]
    pub availability: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub online: bool,
    #[serde(alias = "verified_only", deserialize_with = "lenient::flag")]
    pub verified: bool,
    #[serde(alias = "premium_only", deserialize_with = "lenient::flag")]
    pub premium: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub has_certificates: bool,

    // Personal
    #[serde(deserialize_with = "lenient::text")]
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient::range")]
    pub age_range: Option<(f64, f64)>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "lenient::flag")]
    pub has_portfolio: bool,

    // Advanced
    #[serde(deserialize_with = "lenient::id_list")]
    pub exclude_ids: Vec<ProfileId>,
    #[serde(deserialize_with = "lenient::datetime")]
    pub registered_from: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::datetime")]
    pub registered_to: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient::parsed")]
    pub master_level: Option<MasterLevel>,
    #[serde(deserialize_with = "lenient::parsed")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(alias = "has_special_offer", deserialize_with = "lenient::flag")]
    pub has_special_offers: bool,
}

impl FilterCriteria {
    /// Geo point, present only when both coordinates parsed
    pub fn point(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.lat?, self.lng?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn inverted(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Orient an ascending comparison result
    #[inline]
    pub fn orient(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Sort selection offered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Relevance,
    Rating,
    PriceAsc,
    PriceDesc,
    Distance,
    Popularity,
    Experience,
    Newest,
    NameAsc,
    NameDesc,
    Reviews,
    Activity,
    Views,
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "rating" => Ok(Self::Rating),
            "price_asc" | "price_low" => Ok(Self::PriceAsc),
            "price_desc" | "price_high" => Ok(Self::PriceDesc),
            "distance" => Ok(Self::Distance),
            "popularity" => Ok(Self::Popularity),
            "experience" => Ok(Self::Experience),
            "newest" | "date_desc" | "novelty" => Ok(Self::Newest),
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "reviews" => Ok(Self::Reviews),
            "activity" => Ok(Self::Activity),
            "views" => Ok(Self::Views),
            _ => Err(()),
        }
    }
}

/// Selected sorter, direction and sorter-specific parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    #[serde(alias = "sort_by", deserialize_with = "lenient::parsed_or_default")]
    pub key: SortKey,
    #[serde(deserialize_with = "lenient::parsed")]
    pub direction: Option<SortDirection>,
    #[serde(deserialize_with = "lenient::structured")]
    pub point: Option<GeoPoint>,
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub consider_reviews_count: Option<bool>,
    #[serde(deserialize_with = "lenient::structured")]
    pub popularity_weights: Option<PopularityWeights>,
    #[serde(deserialize_with = "lenient::flag")]
    pub only_with_coordinates: bool,
}

impl SortSpec {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_point(mut self, point: GeoPoint) -> Self {
        self.point = Some(point);
        self
    }
}

/// Accepts either a bare sort key string or a full sort object
fn sort_spec<'de, D>(deserializer: D) -> Result<SortSpec, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let spec = match value {
        Value::String(key) => SortSpec::new(key.trim().parse().unwrap_or_default()),
        other => serde_json::from_value(other).unwrap_or_default(),
    };
    Ok(spec)
}

/// A full search request: text, filters, sort and page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(alias = "q", deserialize_with = "lenient::text")]
    pub query: Option<String>,
    #[serde(flatten)]
    pub filters: FilterCriteria,
    #[serde(deserialize_with = "sort_spec")]
    pub sort: SortSpec,
    #[serde(deserialize_with = "lenient::count")]
    pub page: Option<u32>,
    #[serde(deserialize_with = "lenient::count")]
    pub per_page: Option<u32>,
}
