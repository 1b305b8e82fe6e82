use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::FilterCriteria;
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingParams {
    pub min_rating: Option<f64>,
    pub min_reviews: Option<u32>,
}

/// Minimum average rating and/or review count
///
/// Profiles without reviews have no rating and never pass a rating bound.
#[derive(Debug, Clone, Default)]
pub struct RatingFilter {
    params: RatingParams,
}

impl RatingFilter {
    pub fn new(params: RatingParams) -> Self {
        Self { params }
    }

    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self::new(RatingParams {
            min_rating: criteria.rating,
            min_reviews: criteria.min_reviews,
        })
    }

    /// A zero bound filters nothing
    fn min_rating(&self) -> Option<f64> {
        self.params.min_rating.filter(|r| *r > 0.0)
    }

    fn min_reviews(&self) -> Option<u32> {
        self.params.min_reviews.filter(|r| *r > 0)
    }
}

impl Filter for RatingFilter {
    fn name(&self) -> &'static str {
        "rating"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let min_rating = self.min_rating();
        let min_reviews = self.min_reviews();
        query.filter(|row| {
            let profile = &row.profile;
            min_rating.map_or(true, |min| profile.rating.is_some_and(|r| r >= min))
                && min_reviews.map_or(true, |min| profile.review_count >= min)
        })
    }

    fn is_active(&self) -> bool {
        self.min_rating().is_some() || self.min_reviews().is_some()
    }

    fn active_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(rating) = self.min_rating() {
            params.insert("rating".into(), json!(rating));
        }
        if let Some(reviews) = self.min_reviews() {
            params.insert("min_reviews".into(), json!(reviews));
        }
        params
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if let Some(rating) = self.min_rating() {
            parts.push(format!("рейтинг от {}", rating));
        }
        if let Some(reviews) = self.min_reviews() {
            parts.push(format!("от {} отзывов", reviews));
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.params = RatingParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}
