//! Candidate set construction and scoring.
//!
//! Builds the base query from raw store records, then narrows it by text
//! relevance or by similarity to a reference profile.

use crate::core::query::{contains_ignore_case, OrderTerm, ProfileQuery};
use crate::models::{
    CandidateRecords, ListingSummary, MediaItem, ProfileId, RelevanceWeights, SearchableProfile,
    SortDirection,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Terms shorter than this are ignored by text search
pub const MIN_TERM_CHARS: usize = 2;

/// Price window for similar profiles, as a fraction of the reference price
const SIMILAR_PRICE_TOLERANCE: f64 = 0.4;

/// Experience window for similar profiles, in years
const SIMILAR_EXPERIENCE_WINDOW: u32 = 2;

/// Points awarded per shared attribute when scoring similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityPoints {
    pub specialty: u32,
    pub city: u32,
    pub region: u32,
    pub gender: u32,
    pub experience: u32,
}

impl Default for SimilarityPoints {
    fn default() -> Self {
        Self {
            specialty: 4,
            city: 3,
            region: 2,
            gender: 1,
            experience: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    weights: RelevanceWeights,
    similarity: SimilarityPoints,
}

#[derive(Default)]
struct ReviewTotals {
    count: u32,
    sum: f64,
}

impl QueryBuilder {
    pub fn new(weights: RelevanceWeights) -> Self {
        Self {
            weights,
            similarity: SimilarityPoints::default(),
        }
    }

    pub fn weights(&self) -> &RelevanceWeights {
        &self.weights
    }

    /// Active provider profiles with listing and review aggregates attached
    ///
    /// Profiles without listings or reviews keep zero counts and no rating.
    pub fn base_query(&self, records: &CandidateRecords, now: DateTime<Utc>) -> ProfileQuery {
        let mut listings: HashMap<ProfileId, Vec<ListingSummary>> = HashMap::new();
        for record in records.listings.iter().filter(|l| l.is_active && l.is_published) {
            listings
                .entry(record.profile_id)
                .or_default()
                .push(record.listing.clone());
        }

        let mut reviews: HashMap<ProfileId, ReviewTotals> = HashMap::new();
        for review in &records.reviews {
            let totals = reviews.entry(review.profile_id).or_default();
            totals.count += 1;
            totals.sum += review.rating;
        }

        let mut media: HashMap<ProfileId, Vec<MediaItem>> = HashMap::new();
        for record in &records.media {
            media
                .entry(record.profile_id)
                .or_default()
                .push(record.media.clone());
        }

        let profiles = records
            .profiles
            .iter()
            .filter(|r| r.is_active && r.is_provider)
            .map(|record| {
                let mut profile = record.profile.clone();
                profile.listings = listings.remove(&profile.id).unwrap_or_default();
                profile.listing_count = profile.listings.len() as u32;

                let totals = reviews.remove(&profile.id).unwrap_or_default();
                profile.review_count = totals.count;
                profile.rating = (totals.count > 0).then(|| totals.sum / totals.count as f64);

                profile.media = media.remove(&profile.id).unwrap_or_default();
                profile
            });

        let query = ProfileQuery::from_profiles(profiles, now);
        tracing::debug!(
            "Base query built: {} of {} profiles",
            query.len(),
            records.profiles.len()
        );
        query
    }

    /// Split on whitespace, lowercase, drop short terms
    pub fn parse_terms(text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
            .map(str::to_lowercase)
            .collect()
    }

    /// Sum of field weights over every matching (term, field) pair
    ///
    /// Returns `None` when no term matches any field.
    pub fn relevance_score(&self, profile: &SearchableProfile, terms: &[String]) -> Option<f64> {
        let w = &self.weights;
        let fields = [
            (Some(profile.name.as_str()), w.name),
            (profile.specialty.as_deref(), w.specialty),
            (profile.description.as_deref(), w.description),
            (profile.city.as_deref(), w.city),
            (profile.services_description.as_deref(), w.services_description),
        ];

        let mut matched = false;
        let mut score = 0.0;
        for term in terms {
            for (value, weight) in &fields {
                if value.is_some_and(|v| contains_ignore_case(v, term)) {
                    matched = true;
                    score += weight;
                }
            }
        }
        matched.then_some(score)
    }

    /// Keep rows matching any term and attach `relevance_score`
    ///
    /// Text without usable terms leaves the query unchanged.
    pub fn apply_text_search(&self, query: ProfileQuery, text: &str) -> ProfileQuery {
        let terms = Self::parse_terms(text);
        if terms.is_empty() {
            return query;
        }
        query
            .map_rows(|row| row.relevance_score = self.relevance_score(&row.profile, &terms))
            .filter(|row| row.relevance_score.is_some())
    }

    /// Narrow to profiles resembling `reference` and order by similarity
    pub fn apply_similarity(&self, query: ProfileQuery, reference: &SearchableProfile) -> ProfileQuery {
        let price_window = reference.min_price.filter(|p| *p > 0.0).map(|p| {
            (
                p * (1.0 - SIMILAR_PRICE_TOLERANCE),
                p * (1.0 + SIMILAR_PRICE_TOLERANCE),
            )
        });
        let experience_window = reference.experience_years.filter(|e| *e > 0).map(|e| {
            (
                e.saturating_sub(SIMILAR_EXPERIENCE_WINDOW),
                e.saturating_add(SIMILAR_EXPERIENCE_WINDOW),
            )
        });
        let has_place = reference.city.is_some() || reference.region.is_some();

        query
            .filter(|row| {
                let candidate = &row.profile;
                same_text(&candidate.specialty, &reference.specialty)
                    && price_window.map_or(true, |(lo, hi)| {
                        candidate.min_price.is_some_and(|p| p >= lo && p <= hi)
                    })
                    && (!has_place
                        || both_equal(&candidate.city, &reference.city)
                        || both_equal(&candidate.region, &reference.region))
                    && experience_window.map_or(true, |(lo, hi)| {
                        candidate.experience_years.is_some_and(|e| e >= lo && e <= hi)
                    })
            })
            .map_rows(|row| row.similarity_score = Some(self.similarity_score(&row.profile, reference)))
            .order_by(OrderTerm::Similarity {
                direction: SortDirection::Desc,
            })
    }

    pub fn similarity_score(&self, candidate: &SearchableProfile, reference: &SearchableProfile) -> u32 {
        let points = &self.similarity;
        let mut score = 0;
        if both_equal(&candidate.specialty, &reference.specialty) {
            score += points.specialty;
        }
        if both_equal(&candidate.city, &reference.city) {
            score += points.city;
        }
        if both_equal(&candidate.region, &reference.region) {
            score += points.region;
        }
        if both_equal(&candidate.gender, &reference.gender) {
            score += points.gender;
        }
        let close_experience = match (candidate.experience_years, reference.experience_years) {
            (Some(a), Some(b)) => a.abs_diff(b) <= SIMILAR_EXPERIENCE_WINDOW,
            _ => false,
        };
        if close_experience {
            score += points.experience;
        }
        score
    }
}

/// Case-insensitive equality of two present values
fn both_equal(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}

/// Like [`both_equal`] but an absent reference only matches absent values
fn same_text(candidate: &Option<String>, reference: &Option<String>) -> bool {
    match reference {
        Some(_) => both_equal(candidate, reference),
        None => candidate.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingRecord, MediaKind, MediaRecord, ProviderRecord, ReviewRecord};

    fn record(id: ProfileId) -> ProviderRecord {
        ProviderRecord {
            profile: SearchableProfile {
                id,
                name: format!("Provider {}", id),
                ..Default::default()
            },
            is_active: true,
            is_provider: true,
        }
    }

    #[test]
    fn test_base_query_aggregates() {
        let mut inactive = record(3);
        inactive.is_active = false;

        let records = CandidateRecords {
            profiles: vec![record(1), record(2), inactive],
            listings: vec![
                ListingRecord {
                    profile_id: 1,
                    listing: ListingSummary { id: 10, price: Some(1500.0), ..Default::default() },
                    is_active: true,
                    is_published: true,
                },
                ListingRecord {
                    profile_id: 1,
                    listing: ListingSummary { id: 11, ..Default::default() },
                    is_active: true,
                    is_published: false,
                },
            ],
            reviews: vec![
                ReviewRecord { profile_id: 1, rating: 5.0 },
                ReviewRecord { profile_id: 1, rating: 4.0 },
            ],
            media: vec![MediaRecord {
                profile_id: 1,
                media: MediaItem { kind: MediaKind::Avatar, url: "/a/1.jpg".into() },
            }],
        };

        let rows = QueryBuilder::default().base_query(&records, Utc::now()).fetch();
        assert_eq!(rows.len(), 2);

        let first = &rows[0].profile;
        assert_eq!(first.listing_count, 1);
        assert_eq!(first.review_count, 2);
        assert_eq!(first.rating, Some(4.5));
        assert_eq!(first.avatar_url(), Some("/a/1.jpg"));

        let second = &rows[1].profile;
        assert_eq!(second.review_count, 0);
        assert_eq!(second.rating, None);
    }

    #[test]
    fn test_parse_terms_drops_short_terms() {
        assert_eq!(QueryBuilder::parse_terms("  Массаж и  СПА "), vec!["массаж", "спа"]);
        assert!(QueryBuilder::parse_terms("a b").is_empty());
    }

    #[test]
    fn test_relevance_sums_matching_fields() {
        let profile = SearchableProfile {
            name: "Массаж Анны".into(),
            specialty: Some("массаж".into()),
            city: Some("Москва".into()),
            ..Default::default()
        };
        let builder = QueryBuilder::default();
        let terms = QueryBuilder::parse_terms("массаж москва");

        // name 4.0 + specialty 3.5 + city 2.0
        assert_eq!(builder.relevance_score(&profile, &terms), Some(9.5));
        assert_eq!(builder.relevance_score(&profile, &["йога".to_string()]), None);
    }

    #[test]
    fn test_blank_text_leaves_query_unchanged() {
        let query = ProfileQuery::from_profiles(vec![SearchableProfile::default()], Utc::now());
        let searched = QueryBuilder::default().apply_text_search(query, " x ");
        assert_eq!(searched.len(), 1);
        assert!(searched.rows()[0].relevance_score.is_none());
    }

    #[test]
    fn test_similarity_with_extreme_experience() {
        let reference = SearchableProfile {
            id: 1,
            specialty: Some("массаж".into()),
            experience_years: Some(u32::MAX),
            ..Default::default()
        };
        let close = SearchableProfile {
            id: 2,
            experience_years: Some(u32::MAX - 1),
            ..reference.clone()
        };
        let far = SearchableProfile {
            id: 3,
            experience_years: Some(5),
            ..reference.clone()
        };
        let query = ProfileQuery::from_profiles(vec![close, far], Utc::now());

        let rows = QueryBuilder::default().apply_similarity(query, &reference).fetch();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), 2);
    }
}
