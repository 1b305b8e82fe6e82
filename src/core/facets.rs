//! Facet counts over a filtered candidate set.
//!
//! Every dimension (and every bucket within a dimension) is counted on its
//! own clone of the input query, so facet computation never disturbs the
//! caller's query or another facet.

use crate::core::query::ProfileQuery;
use crate::models::{RankedResult, SearchableProfile};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CITY_LIMIT: usize = 20;
pub const DEFAULT_SPECIALTY_LIMIT: usize = 15;

/// Half-open `[lo, hi)` experience buckets in years
pub const EXPERIENCE_BUCKETS: [(&str, u32, u32); 4] = [
    ("Новичок (0-1 год)", 0, 1),
    ("Начинающий (1-3 года)", 1, 3),
    ("Опытный (3-7 лет)", 3, 7),
    ("Эксперт (7+ лет)", 7, 100),
];

/// Half-open `[lo, hi)` price buckets; `None` is unbounded
pub const PRICE_BUCKETS: [(&str, Option<f64>, Option<f64>); 5] = [
    ("До 1500", None, Some(1500.0)),
    ("1500-2500", Some(1500.0), Some(2500.0)),
    ("2500-4000", Some(2500.0), Some(4000.0)),
    ("4000-6000", Some(4000.0), Some(6000.0)),
    ("От 6000", Some(6000.0), None),
];

/// Cumulative minimum-rating buckets
pub const RATING_BUCKETS: [(&str, f64); 4] = [("4.8+", 4.8), ("4.5+", 4.5), ("4.0+", 4.0), ("3.5+", 3.5)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacetDimension {
    Cities,
    Specialties,
    ExperienceLevels,
    PriceRanges,
    Ratings,
    Genders,
}

impl FacetDimension {
    pub const ALL: [FacetDimension; 6] = [
        FacetDimension::Cities,
        FacetDimension::Specialties,
        FacetDimension::ExperienceLevels,
        FacetDimension::PriceRanges,
        FacetDimension::Ratings,
        FacetDimension::Genders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cities => "cities",
            Self::Specialties => "specialties",
            Self::ExperienceLevels => "experience_levels",
            Self::PriceRanges => "price_ranges",
            Self::Ratings => "ratings",
            Self::Genders => "genders",
        }
    }
}

impl FromStr for FacetDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cities" | "city" => Ok(Self::Cities),
            "specialties" | "specialty" => Ok(Self::Specialties),
            "experience_levels" | "experience" => Ok(Self::ExperienceLevels),
            "price_ranges" | "price" => Ok(Self::PriceRanges),
            "ratings" | "rating" => Ok(Self::Ratings),
            "genders" | "gender" => Ok(Self::Genders),
            other => Err(format!("unknown facet dimension: {}", other)),
        }
    }
}

impl fmt::Display for FacetDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FacetDimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    pub label: String,
    pub count: usize,
}

/// dimension -> ordered buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FacetResult {
    facets: BTreeMap<FacetDimension, Vec<FacetBucket>>,
}

impl FacetResult {
    pub fn get(&self, dimension: FacetDimension) -> Option<&[FacetBucket]> {
        self.facets.get(&dimension).map(Vec::as_slice)
    }

    /// Bucket label -> count for one dimension
    pub fn counts(&self, dimension: FacetDimension) -> BTreeMap<String, usize> {
        self.get(dimension)
            .unwrap_or_default()
            .iter()
            .map(|b| (b.label.clone(), b.count))
            .collect()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = FacetDimension> + '_ {
        self.facets.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FacetCalculator {
    city_limit: usize,
    specialty_limit: usize,
}

impl Default for FacetCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_CITY_LIMIT, DEFAULT_SPECIALTY_LIMIT)
    }
}

impl FacetCalculator {
    pub fn new(city_limit: usize, specialty_limit: usize) -> Self {
        Self {
            city_limit,
            specialty_limit,
        }
    }

    /// Compute the requested dimensions (all of them when `dimensions` is empty)
    pub fn calculate(&self, query: &ProfileQuery, dimensions: &[FacetDimension]) -> FacetResult {
        let dimensions = if dimensions.is_empty() {
            &FacetDimension::ALL[..]
        } else {
            dimensions
        };

        let facets = dimensions
            .iter()
            .map(|dim| (*dim, self.dimension(query.clone(), *dim)))
            .collect();
        FacetResult { facets }
    }

    fn dimension(&self, query: ProfileQuery, dimension: FacetDimension) -> Vec<FacetBucket> {
        match dimension {
            FacetDimension::Cities => {
                top_values(&query, |p| p.city.as_deref(), Some(self.city_limit))
            }
            FacetDimension::Specialties => {
                top_values(&query, |p| p.specialty.as_deref(), Some(self.specialty_limit))
            }
            FacetDimension::Genders => top_values(&query, |p| p.gender.as_deref(), None),
            FacetDimension::ExperienceLevels => buckets(
                &query,
                EXPERIENCE_BUCKETS.iter().map(|(label, lo, hi)| {
                    let (lo, hi) = (*lo, *hi);
                    (*label, move |row: &RankedResult| {
                        row.profile.experience_years.is_some_and(|e| e >= lo && e < hi)
                    })
                }),
            ),
            FacetDimension::PriceRanges => buckets(
                &query,
                PRICE_BUCKETS.iter().map(|(label, lo, hi)| {
                    let (lo, hi) = (*lo, *hi);
                    (*label, move |row: &RankedResult| {
                        row.profile.min_price.is_some_and(|p| {
                            lo.map_or(true, |lo| p >= lo) && hi.map_or(true, |hi| p < hi)
                        })
                    })
                }),
            ),
            FacetDimension::Ratings => buckets(
                &query,
                RATING_BUCKETS.iter().map(|(label, min)| {
                    let min = *min;
                    (*label, move |row: &RankedResult| {
                        row.profile.rating.is_some_and(|r| r >= min)
                    })
                }),
            ),
        }
    }
}

/// Count each bucket predicate on its own clone; zero counts are omitted
fn buckets<I, F>(query: &ProfileQuery, definitions: I) -> Vec<FacetBucket>
where
    I: IntoIterator<Item = (&'static str, F)>,
    F: Fn(&RankedResult) -> bool,
{
    definitions
        .into_iter()
        .map(|(label, predicate)| FacetBucket {
            label: label.to_string(),
            count: query.clone().filter(predicate).len(),
        })
        .filter(|b| b.count > 0)
        .collect()
}

/// Group by a text column, count desc then label asc; nulls dropped
fn top_values<F>(query: &ProfileQuery, column: F, limit: Option<usize>) -> Vec<FacetBucket>
where
    F: Fn(&SearchableProfile) -> Option<&str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in query.rows() {
        if let Some(value) = column(&row.profile).filter(|v| !v.is_empty()) {
            *counts.entry(value).or_default() += 1;
        }
    }

    let mut values: Vec<FacetBucket> = counts
        .into_iter()
        .map(|(label, count)| FacetBucket {
            label: label.to_string(),
            count,
        })
        .collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    if let Some(limit) = limit {
        values.truncate(limit);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn query() -> ProfileQuery {
        let cities = ["Москва", "Казань", "Москва", "Сочи"];
        let profiles = cities.iter().enumerate().map(|(i, city)| SearchableProfile {
            id: i as u64 + 1,
            city: Some(city.to_string()),
            experience_years: Some(i as u32 * 3),
            rating: Some(4.0 + i as f64 * 0.3),
            ..Default::default()
        });
        ProfileQuery::from_profiles(profiles, Utc::now())
    }

    #[test]
    fn test_city_counts_ordered_and_limited() {
        let result = FacetCalculator::new(2, 15).calculate(&query(), &[FacetDimension::Cities]);
        let cities = result.get(FacetDimension::Cities).unwrap();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0], FacetBucket { label: "Москва".into(), count: 2 });
        assert_eq!(cities[1].label, "Казань");
    }

    #[test]
    fn test_experience_buckets_half_open() {
        // experience 0, 3, 6, 9
        let result = FacetCalculator::default().calculate(&query(), &[FacetDimension::ExperienceLevels]);
        let counts = result.counts(FacetDimension::ExperienceLevels);

        assert_eq!(counts.get("Новичок (0-1 год)"), Some(&1));
        assert_eq!(counts.get("Начинающий (1-3 года)"), None);
        assert_eq!(counts.get("Опытный (3-7 лет)"), Some(&2));
        assert_eq!(counts.get("Эксперт (7+ лет)"), Some(&1));
    }

    #[test]
    fn test_rating_buckets_are_cumulative() {
        // ratings 4.0, 4.3, 4.6, 4.9
        let result = FacetCalculator::default().calculate(&query(), &[FacetDimension::Ratings]);
        let counts = result.counts(FacetDimension::Ratings);

        assert_eq!(counts["4.8+"], 1);
        assert_eq!(counts["4.5+"], 2);
        assert_eq!(counts["4.0+"], 4);
        assert_eq!(counts["3.5+"], 4);
    }

    #[test]
    fn test_input_query_untouched() {
        let query = query();
        let _ = FacetCalculator::default().calculate(&query, &[]);
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!("city".parse::<FacetDimension>(), Ok(FacetDimension::Cities));
        assert!("colour".parse::<FacetDimension>().is_err());
    }
}
